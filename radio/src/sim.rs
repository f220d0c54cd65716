//! A radio that runs on the host.
//!
//! Captures are synthesized on a dedicated OS thread standing in for the
//! driver's receive interrupt. Transmission goes into a bounded buffer that
//! drains at a fixed rate, so a sender pushing faster than the drain rate sees
//! [`TxError::BufferFull`] just like on hardware. Association events are
//! raised explicitly with [`SimRadio::associate`] and
//! [`SimRadio::disassociate`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
    thread,
    time::{Duration, Instant},
};

use csi::{channel::SecondaryChannel, ieee80211::NullFrame, CaptureInfo};
use macaddr::MacAddr6;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::{
    ApEvent, ApEvents, CaptureCallback, CsiCapture, CsiConfig, Error, RawTransmit, SoftApConfig,
    StationConfig, TxError,
};

const EVENT_QUEUE_DEPTH: usize = 16;

/// Parameters of the simulated hardware.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Address of the local interface.
    pub mac: MacAddr6,
    /// Address reported as the transmitter of synthesized captures.
    pub peer: MacAddr6,
    pub channel: u8,
    /// Time between synthesized captures.
    pub capture_interval: Duration,
    /// Subcarriers per synthesized capture.
    pub subcarriers: usize,
    /// Frames the transmit buffer holds.
    pub tx_depth: usize,
    /// Time the air interface needs per frame.
    pub tx_airtime: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mac: MacAddr6::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x01),
            peer: MacAddr6::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x02),
            channel: 6,
            capture_interval: Duration::from_millis(10),
            subcarriers: 64,
            tx_depth: 8,
            tx_airtime: Duration::from_millis(2),
        }
    }
}

/// Frames waiting for airtime.
#[derive(Debug)]
struct TxBuffer {
    depth: usize,
    airtime: Duration,
    queued: usize,
    last_drain: Instant,
}

impl TxBuffer {
    fn drain(&mut self, now: Instant) {
        if self.queued == 0 || self.airtime.is_zero() {
            self.queued = 0;
            self.last_drain = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_drain);
        let sent = (elapsed.as_nanos() / self.airtime.as_nanos()) as usize;
        let sent = sent.min(self.queued);
        self.queued -= sent;
        // keep the partially elapsed airtime of the frame on the air
        self.last_drain += self.airtime * sent as u32;
        if self.queued == 0 {
            self.last_drain = now;
        }
    }

    fn push(&mut self, now: Instant) -> Result<(), TxError> {
        self.drain(now);
        if self.queued >= self.depth {
            return Err(TxError::BufferFull);
        }
        self.queued += 1;
        Ok(())
    }
}

struct Inner {
    config: SimConfig,
    started: AtomicBool,
    callback: Mutex<Option<Arc<dyn Fn(&CaptureInfo<'_>) + Send + Sync>>>,
    tx: Mutex<TxBuffer>,
    events_tx: mpsc::Sender<ApEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<ApEvent>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // nothing held under these locks can be left half-updated
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated radio. Cheap to clone; clones share the same hardware.
#[derive(Clone)]
pub struct SimRadio {
    inner: Arc<Inner>,
}

impl SimRadio {
    pub fn new(config: SimConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let tx = TxBuffer {
            depth: config.tx_depth,
            airtime: config.tx_airtime,
            queued: 0,
            last_drain: Instant::now(),
        };

        Self {
            inner: Arc::new(Inner {
                config,
                started: AtomicBool::new(false),
                callback: Mutex::new(None),
                tx: Mutex::new(tx),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        }
    }

    /// Joins a network as a station.
    #[instrument(skip_all, fields(ssid = %config.ssid))]
    pub fn start_station(&self, config: &StationConfig) -> Result<(), Error> {
        config.validate()?;
        self.inner.started.store(true, Ordering::Release);
        info!(auth = ?config.auth_mode(), "station connected");
        Ok(())
    }

    /// Starts an access point.
    #[instrument(skip_all, fields(ssid = %config.ssid, channel = config.channel))]
    pub fn start_ap(&self, config: &SoftApConfig) -> Result<(), Error> {
        let mhz = config.validate()?;
        self.inner.started.store(true, Ordering::Release);
        info!(mhz, auth = ?config.auth_mode(), "access point started");
        Ok(())
    }

    /// Invokes the registered capture callback on the calling thread.
    ///
    /// Returns `false` if no callback is registered.
    pub fn inject(&self, info: &CaptureInfo<'_>) -> bool {
        self.inner.deliver(info)
    }

    /// Raises a station association event.
    pub fn associate(&self, mac: MacAddr6, aid: u8) {
        self.inner.raise(ApEvent::StationConnected { mac, aid });
    }

    /// Raises a station disassociation event.
    pub fn disassociate(&self, mac: MacAddr6, aid: u8) {
        self.inner.raise(ApEvent::StationDisconnected { mac, aid });
    }
}

impl Inner {
    fn deliver(&self, info: &CaptureInfo<'_>) -> bool {
        // clone out of the lock so the callback never runs under it
        let Some(callback) = lock(&self.callback).clone() else {
            return false;
        };
        callback(info);
        true
    }

    fn raise(&self, event: ApEvent) {
        if self.events_tx.try_send(event).is_err() {
            warn!(?event, "association event dropped");
        }
    }
}

/// Synthesizes captures until the radio is dropped.
fn capture_thread(inner: Weak<Inner>, interval: Duration, peer: MacAddr6, channel: u8, n: usize) {
    let mut rng = StdRng::from_entropy();
    let mut payload = vec![0i8; n * 2];
    let mut sequence: u16 = 0;

    loop {
        thread::sleep(interval);
        let Some(inner) = inner.upgrade() else {
            debug!("radio dropped, capture thread exiting");
            return;
        };

        rng.fill(&mut payload[..]);
        let info = CaptureInfo {
            source_mac: peer,
            sequence,
            rssi: rng.gen_range(-75..=-30),
            noise_floor: rng.gen_range(-96..=-88),
            channel,
            secondary_channel: SecondaryChannel::None,
            payload: &payload,
        };
        inner.deliver(&info);
        sequence = sequence.wrapping_add(1);
    }
}

impl CsiCapture for SimRadio {
    #[instrument(skip_all)]
    fn start_capture(&self, config: &CsiConfig, callback: CaptureCallback) -> Result<(), Error> {
        if !self.inner.started.load(Ordering::Acquire) {
            return Err(Error::NotStarted);
        }

        {
            let mut slot = lock(&self.inner.callback);
            if slot.is_some() {
                return Err(Error::CallbackRegistered);
            }
            *slot = Some(Arc::from(callback));
        }

        let cfg = &self.inner.config;
        if !cfg.capture_interval.is_zero() {
            let weak = Arc::downgrade(&self.inner);
            let (interval, peer, channel, n) =
                (cfg.capture_interval, cfg.peer, cfg.channel, cfg.subcarriers);
            thread::Builder::new()
                .name("csi-rx".into())
                .spawn(move || capture_thread(weak, interval, peer, channel, n))?;
        }

        info!(?config, "CSI capture enabled");
        Ok(())
    }
}

impl RawTransmit for SimRadio {
    fn ap_mac(&self) -> MacAddr6 {
        self.inner.config.mac
    }

    fn transmit(&self, frame: &[u8]) -> Result<(), TxError> {
        if !self.inner.started.load(Ordering::Acquire) {
            return Err(TxError::NotStarted);
        }
        if frame.len() < NullFrame::LEN {
            return Err(TxError::InvalidLength(frame.len()));
        }
        lock(&self.inner.tx).push(Instant::now())
    }
}

impl ApEvents for SimRadio {
    fn ap_events(&self) -> Result<mpsc::Receiver<ApEvent>, Error> {
        lock(&self.inner.events_rx).take().ok_or(Error::EventsTaken)
    }
}
