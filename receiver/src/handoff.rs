//! Bounded queue between the capture callback and the relay worker.
//!
//! Records move through the queue by value: the producer gives up ownership
//! on a successful push, and a rejected record is dropped on the spot. The
//! producer side never blocks, so it is safe to use from the radio's capture
//! thread. When the queue is full the incoming record is the one that is
//! dropped; records already queued are never displaced.

use std::{fmt, sync::Arc};

use atomic_counter::{AtomicCounter, RelaxedCounter};
use csi::Record;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("handoff queue depth must be at least 1")]
pub struct ZeroDepth;

/// Why a record was not queued. The record itself is already gone.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum Rejected {
    #[error("queue full")]
    Full,
    #[error("consumer gone")]
    Closed,
}

/// Queue statistics, shared by both ends.
pub struct Counters {
    enqueued: RelaxedCounter,
    dropped: RelaxedCounter,
}

impl Counters {
    fn new() -> Self {
        Self {
            enqueued: RelaxedCounter::new(0),
            dropped: RelaxedCounter::new(0),
        }
    }

    /// Records accepted by the queue.
    pub fn enqueued(&self) -> usize {
        self.enqueued.get()
    }

    /// Records rejected by the queue.
    pub fn dropped(&self) -> usize {
        self.dropped.get()
    }
}

impl fmt::Debug for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counters")
            .field("enqueued", &self.enqueued())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Creates a queue holding at most `depth` records.
pub fn channel(depth: usize) -> Result<(Producer, Consumer), ZeroDepth> {
    if depth == 0 {
        return Err(ZeroDepth);
    }

    let (tx, rx) = mpsc::channel(depth);
    let counters = Arc::new(Counters::new());

    Ok((
        Producer {
            tx,
            counters: counters.clone(),
        },
        Consumer { rx, counters },
    ))
}

#[derive(Debug, Clone)]
pub struct Producer {
    tx: mpsc::Sender<Record>,
    counters: Arc<Counters>,
}

impl Producer {
    /// Queues `record` without blocking.
    ///
    /// Wakes the consumer if it is waiting.
    pub fn try_push(&self, record: Record) -> Result<(), Rejected> {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.counters.enqueued.inc();
                Ok(())
            }
            Err(err) => {
                self.counters.dropped.inc();
                // the rejected record is freed here
                match err {
                    TrySendError::Full(_) => Err(Rejected::Full),
                    TrySendError::Closed(_) => Err(Rejected::Closed),
                }
            }
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }
}

#[derive(Debug)]
pub struct Consumer {
    rx: mpsc::Receiver<Record>,
    counters: Arc<Counters>,
}

impl Consumer {
    /// Waits for the next record.
    ///
    /// Returns `None` once every producer is gone and the queue is empty.
    pub async fn pop(&mut self) -> Option<Record> {
        self.rx.recv().await
    }

    /// Takes the next record if one is queued.
    pub fn try_pop(&mut self) -> Option<Record> {
        self.rx.try_recv().ok()
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }
}
