//! The CSI callback registered with the radio driver.
//!
//! Runs on the driver's thread for every received frame, so it only copies
//! the capture and tries to queue it. Allocation failure and a full queue are
//! both expected under load: the frame is dropped, one line is logged, and
//! the driver moves on.

use std::sync::Arc;

use atomic_counter::{AtomicCounter, RelaxedCounter};
use csi::{CaptureInfo, Record};
use radio::CaptureCallback;
use tracing::{error, warn};

use crate::handoff::{Producer, Rejected};

/// What happened to one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Queued,
    /// The queue had no room.
    Dropped,
    /// The record could not be built.
    Failed,
}

pub struct Capture {
    queue: Producer,
    failed: Arc<RelaxedCounter>,
}

impl Capture {
    pub fn new(queue: Producer) -> Self {
        Self {
            queue,
            failed: Arc::new(RelaxedCounter::new(0)),
        }
    }

    pub fn on_frame(&self, info: &CaptureInfo<'_>) -> Outcome {
        let record = match Record::capture(info) {
            Ok(record) => record,
            Err(err) => {
                self.failed.inc();
                error!(seq = info.sequence, %err, "CSI packet allocation failed");
                return Outcome::Failed;
            }
        };

        match self.queue.try_push(record) {
            Ok(()) => Outcome::Queued,
            Err(Rejected::Full) => {
                warn!(seq = info.sequence, "CSI queue full, dropping frame");
                Outcome::Dropped
            }
            Err(Rejected::Closed) => {
                warn!(seq = info.sequence, "relay gone, dropping frame");
                Outcome::Dropped
            }
        }
    }

    /// Captures that never reached the queue because the record could not be
    /// built.
    pub fn failed(&self) -> usize {
        self.failed.get()
    }

    /// Shared handle on [`Capture::failed`], readable after the capture has
    /// been handed to the driver.
    pub fn failures(&self) -> &Arc<RelaxedCounter> {
        &self.failed
    }

    /// Boxes this capture as a driver callback.
    pub fn into_callback(self) -> CaptureCallback {
        Box::new(move |info: &CaptureInfo<'_>| {
            self.on_frame(info);
        })
    }
}
