//! What the capture pipeline and the stimulus loop need from a Wi-Fi radio.
//!
//! The driver owns CSI extraction, raw frame transmission and the access
//! point's association state machine. This crate only describes those
//! capabilities as traits, plus [`sim::SimRadio`] which provides all of them
//! on a host machine.

use csi::CaptureInfo;
use macaddr::MacAddr6;

pub mod config;
pub mod sim;

pub use config::{AuthMode, CsiConfig, SoftApConfig, StationConfig};

/// Called by the driver for every received CSI-bearing frame.
///
/// Runs on the driver's own thread with a hard latency budget: it must not
/// block.
pub type CaptureCallback = Box<dyn Fn(&CaptureInfo<'_>) + Send + Sync + 'static>;

/// Errors returned while bringing the radio up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("radio not started")]
    NotStarted,
    #[error("capture callback already registered")]
    CallbackRegistered,
    #[error("association events already taken")]
    EventsTaken,
    #[error("invalid channel {0}")]
    InvalidChannel(u8),
    #[error("ssid must be 1 to 32 bytes, got {0}")]
    InvalidSsid(usize),
    #[error("password must be empty or 8 to 63 bytes, got {0}")]
    InvalidPassword(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raw transmission failures.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum TxError {
    /// The driver's transmit queue has no room left. Transient.
    #[error("transmit buffer full")]
    BufferFull,
    #[error("interface not started")]
    NotStarted,
    #[error("invalid frame length {0}")]
    InvalidLength(usize),
}

/// Access point association notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApEvent {
    StationConnected { mac: MacAddr6, aid: u8 },
    StationDisconnected { mac: MacAddr6, aid: u8 },
}

/// CSI extraction.
pub trait CsiCapture {
    /// Applies `config` and starts invoking `callback` for every capture.
    fn start_capture(&self, config: &CsiConfig, callback: CaptureCallback) -> Result<(), Error>;
}

/// Raw 802.11 transmission on the access point interface.
pub trait RawTransmit {
    /// Hardware address of the access point interface.
    fn ap_mac(&self) -> MacAddr6;

    /// Queues a complete 802.11 frame (header included) for transmission.
    fn transmit(&self, frame: &[u8]) -> Result<(), TxError>;
}

impl<T: RawTransmit + ?Sized> RawTransmit for std::sync::Arc<T> {
    fn ap_mac(&self) -> MacAddr6 {
        (**self).ap_mac()
    }

    fn transmit(&self, frame: &[u8]) -> Result<(), TxError> {
        (**self).transmit(frame)
    }
}

/// Association state of the access point.
pub trait ApEvents {
    /// Stream of association events. Can only be taken once.
    fn ap_events(&self) -> Result<tokio::sync::mpsc::Receiver<ApEvent>, Error>;
}
