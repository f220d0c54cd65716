//! Whether a station is associated with the access point.
//!
//! The tracker is the only writer; the stimulus loop is the only reader.
//! Flapping links are passed through as is.

use csi::frame::format_mac;
use radio::ApEvent;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("link tracker gone")]
pub struct TrackerGone;

/// Updates the link state from association events.
#[derive(Debug)]
pub struct LinkTracker {
    state: watch::Sender<bool>,
}

/// Read side of the link state.
#[derive(Debug, Clone)]
pub struct LinkState {
    rx: watch::Receiver<bool>,
}

impl LinkTracker {
    /// Starts detached.
    pub fn new() -> (Self, LinkState) {
        let (state, rx) = watch::channel(false);
        (Self { state }, LinkState { rx })
    }

    pub fn on_event(&self, event: &ApEvent) {
        match *event {
            ApEvent::StationConnected { mac, aid } => {
                info!(mac = %format_mac(&mac), aid, "station joined");
                self.state.send_replace(true);
            }
            ApEvent::StationDisconnected { mac, aid } => {
                warn!(mac = %format_mac(&mac), aid, "station left");
                // only notify on an actual change
                self.state
                    .send_if_modified(|attached| std::mem::replace(attached, false));
            }
        }
    }

    /// Follows `events` until the driver closes the stream.
    pub async fn run(self, mut events: mpsc::Receiver<ApEvent>) {
        while let Some(event) = events.recv().await {
            self.on_event(&event);
        }
    }
}

impl LinkState {
    pub fn is_attached(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns once a station is attached, immediately if one already is.
    pub async fn attached(&mut self) -> Result<(), TrackerGone> {
        self.rx
            .wait_for(|attached| *attached)
            .await
            .map(|_| ())
            .map_err(|_| TrackerGone)
    }
}
