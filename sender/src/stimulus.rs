//! Null frame generator.
//!
//! While a station is attached, a null frame is sent to it every interval so
//! the station has fresh frames to extract CSI from. A full transmit buffer
//! stretches the interval additively up to ten times its base; the next
//! successful send restores it.

use std::time::Duration;

use csi::{
    frame::format_mac,
    ieee80211::{NullFrame, SequenceNumber},
};
use macaddr::MacAddr6;
use radio::{RawTransmit, TxError};
use tracing::{error, info, warn};

use crate::link::{LinkState, TrackerGone};

/// Consecutive buffer-full failures between two warnings.
pub const WARN_EVERY: u32 = 25;

/// Upper bound of the delay as a multiple of the base interval.
pub const MAX_BACKOFF_FACTOR: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            current: base,
            failures: 0,
        }
    }

    /// Delay before the next transmission.
    pub fn delay(&self) -> Duration {
        self.current
    }

    pub fn max(&self) -> Duration {
        self.base * MAX_BACKOFF_FACTOR
    }

    /// Consecutive buffer-full failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.current = self.base;
        self.failures = 0;
    }

    /// Records a buffer-full failure and returns the failure count.
    pub fn stretch(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.current = (self.current + self.base).min(self.max());
        self.failures
    }
}

pub struct Stimulus<R> {
    radio: R,
    frame: NullFrame,
    link: LinkState,
    backoff: Backoff,
}

impl<R: RawTransmit> Stimulus<R> {
    pub fn new(radio: R, peer: MacAddr6, interval: Duration, link: LinkState) -> Self {
        let frame = NullFrame::from_ap(peer, radio.ap_mac());

        Self {
            radio,
            frame,
            link,
            backoff: Backoff::new(interval),
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Sequence number the next frame will carry.
    pub fn sequence(&self) -> SequenceNumber {
        self.frame.sequence
    }

    /// Sends one frame and returns the delay before the next one.
    pub fn transmit(&mut self) -> Duration {
        let bytes = self.frame.to_bytes();
        self.frame.sequence = self.frame.sequence.next();

        match self.radio.transmit(&bytes) {
            Ok(()) => self.backoff.reset(),
            Err(TxError::BufferFull) => {
                let failures = self.backoff.stretch();
                if failures % WARN_EVERY == 1 {
                    warn!(
                        failures,
                        delay_ms = self.backoff.delay().as_millis() as u64,
                        "transmit buffer full, backing off"
                    );
                }
            }
            Err(err) => error!(%err, "failed to transmit null frame"),
        }

        self.backoff.delay()
    }

    /// Transmits while a station is attached and idles otherwise. Only
    /// returns once the link tracker is gone.
    pub async fn run(mut self) -> Result<(), TrackerGone> {
        info!(
            peer = %format_mac(&self.frame.addr1),
            interval_ms = self.backoff.base.as_millis() as u64,
            "stimulus started"
        );

        loop {
            self.link.attached().await?;
            let delay = self.transmit();
            tokio::time::sleep(delay).await;
        }
    }
}
