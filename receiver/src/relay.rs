//! The relay worker: takes records off the handoff queue and posts them.
//!
//! Delivery is at most once. A record whose post fails is logged and dropped,
//! and the worker waits out the retry delay before touching the next record,
//! so a failing backend slows the worker down and the queue absorbs the
//! difference (dropping at the producer once full).

use std::{future::Future, sync::Arc, time::Duration};

use atomic_counter::{AtomicCounter, RelaxedCounter};
use chrono::Utc;
use csi::{
    document::{Document, Label},
    Record,
};
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::handoff::Consumer;

/// Backend route receiving CSI documents.
pub const CSI_PATH: &str = "/csi";

/// Where documents are delivered.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Posts a JSON `body` to `path`.
    ///
    /// Any response counts as `Ok`, whatever its status.
    fn post(
        &mut self,
        path: &str,
        body: String,
    ) -> impl Future<Output = Result<StatusCode, Self::Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Device label sent as `mac_address`.
    pub label: Label,
    /// Pause after a failed delivery.
    pub retry_delay: Duration,
    /// Largest document, in bytes.
    pub capacity: usize,
}

impl RelayConfig {
    /// Fails if `capacity` cannot hold the document header for `label`, in
    /// which case every record would be dropped unsent.
    pub fn check(&self) -> Result<(), csi::document::Error> {
        Document::check_capacity(&self.label, self.capacity)
    }
}

/// Result of relaying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered(StatusCode),
    /// The backend answered with status 300 or above.
    Rejected(StatusCode),
    /// No response.
    Failed,
    /// The record could not be rendered and was not sent.
    Unserializable,
}

pub struct Stats {
    delivered: RelaxedCounter,
    failed: RelaxedCounter,
    unserializable: RelaxedCounter,
}

impl Stats {
    pub fn delivered(&self) -> usize {
        self.delivered.get()
    }

    /// Records whose post was rejected or failed.
    pub fn failed(&self) -> usize {
        self.failed.get()
    }

    pub fn unserializable(&self) -> usize {
        self.unserializable.get()
    }
}

pub struct Relay<T> {
    transport: T,
    queue: Consumer,
    config: RelayConfig,
    stats: Arc<Stats>,
}

impl<T: Transport> Relay<T> {
    pub fn new(transport: T, queue: Consumer, config: RelayConfig) -> Self {
        Self {
            transport,
            queue,
            config,
            stats: Arc::new(Stats {
                delivered: RelaxedCounter::new(0),
                failed: RelaxedCounter::new(0),
                unserializable: RelaxedCounter::new(0),
            }),
        }
    }

    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    /// Relays records until the queue closes.
    pub async fn run(mut self) {
        while let Some(record) = self.queue.pop().await {
            self.relay(record).await;
        }
        info!("handoff queue closed, relay stopping");
    }

    /// Renders and posts one record, then drops it.
    pub async fn relay(&mut self, record: Record) -> Delivery {
        let seq = record.sequence;
        let doc = match Document::render(
            &record,
            &self.config.label,
            Utc::now(),
            self.config.capacity,
        ) {
            Ok(doc) => doc,
            Err(err) => {
                self.stats.unserializable.inc();
                error!(seq, %err, "failed to render CSI document");
                return Delivery::Unserializable;
            }
        };
        if doc.truncated() {
            warn!(
                seq,
                pairs = doc.pairs(),
                total = record.n_subcarriers(),
                "CSI array truncated"
            );
        }

        let delivery = match self.transport.post(CSI_PATH, doc.into_body()).await {
            Ok(status) if status.as_u16() < 300 => Delivery::Delivered(status),
            Ok(status) => {
                error!(seq, %status, "POST {CSI_PATH} rejected");
                Delivery::Rejected(status)
            }
            Err(err) => {
                error!(seq, %err, "POST {CSI_PATH} failed");
                Delivery::Failed
            }
        };

        if let Delivery::Delivered(status) = delivery {
            self.stats.delivered.inc();
            debug!(seq, %status, "CSI delivered");
        } else {
            self.stats.failed.inc();
            tokio::time::sleep(self.config.retry_delay).await;
        }

        drop(record);
        delivery
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use csi::{
        channel::SecondaryChannel,
        document::{Label, DEFAULT_CAPACITY},
        CaptureInfo, Record,
    };
    use macaddr::MacAddr6;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use reqwest::StatusCode;
    use serde_json::Value;
    use tokio::time::Instant;

    use super::{Delivery, Relay, RelayConfig, Transport, CSI_PATH};
    use crate::{capture::Capture, handoff};

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    type Posts = Arc<Mutex<Vec<(String, String)>>>;

    /// Answers from a script, falling back to 200.
    struct Scripted {
        script: Vec<Option<u16>>,
        posts: Posts,
    }

    impl Scripted {
        fn new(script: impl IntoIterator<Item = Option<u16>>) -> (Self, Posts) {
            let posts = Posts::default();
            let mut script: Vec<_> = script.into_iter().collect();
            script.reverse();
            (
                Self {
                    script,
                    posts: posts.clone(),
                },
                posts,
            )
        }
    }

    impl Transport for Scripted {
        type Error = Reset;

        async fn post(&mut self, path: &str, body: String) -> Result<StatusCode, Reset> {
            self.posts.lock().unwrap().push((path.to_string(), body));
            match self.script.pop().unwrap_or(Some(200)) {
                Some(code) => Ok(StatusCode::from_u16(code).unwrap()),
                None => Err(Reset),
            }
        }
    }

    fn info(sequence: u16, payload: &[i8]) -> CaptureInfo<'_> {
        CaptureInfo {
            source_mac: MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff),
            sequence,
            rssi: -40,
            noise_floor: -90,
            channel: 6,
            secondary_channel: SecondaryChannel::None,
            payload,
        }
    }

    fn config(retry_delay: Duration) -> RelayConfig {
        RelayConfig {
            label: Label::new("rx-test"),
            retry_delay,
            capacity: DEFAULT_CAPACITY,
        }
    }

    fn sequence_ids(posts: &Posts) -> Vec<u64> {
        posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| {
                let v: Value = serde_json::from_str(body).unwrap();
                v["sequence_id"].as_u64().unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn capture_to_post() {
        let (producer, consumer) = handoff::channel(4).unwrap();
        let capture = Capture::new(producer);
        capture.on_frame(&info(7, &[10, -10, 20, -20, 30, -30, 40, -40]));
        drop(capture);

        let (transport, posts) = Scripted::new([]);
        let relay = Relay::new(transport, consumer, config(Duration::ZERO));
        let stats = relay.stats();
        relay.run().await;

        let posts = posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let (path, body) = &posts[0];
        assert_eq!(path, CSI_PATH);

        let v: Value = serde_json::from_str(body).unwrap();
        assert_eq!(v["mac_address"], "rx-test");
        assert_eq!(v["source_mac"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(v["sequence_id"], 7);
        assert_eq!(v["rssi"], -40);
        assert_eq!(v["noise_floor"], -90);
        let csi = v["csi"].as_array().unwrap();
        assert_eq!(csi.len(), 4);
        assert!(csi.iter().all(|pair| pair.as_array().unwrap().len() == 2));
        assert_eq!(csi[0], serde_json::json!([10, -10]));

        assert_eq!(stats.delivered(), 1);
        assert_eq!(stats.failed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_wait_and_move_on() {
        let retry = Duration::from_millis(1500);
        let (producer, consumer) = handoff::channel(8).unwrap();
        for seq in 0..4 {
            producer
                .try_push(Record::capture(&info(seq, &[1, 2])).unwrap())
                .unwrap();
        }
        drop(producer);

        let (transport, posts) = Scripted::new([Some(500), Some(500), Some(500), Some(200)]);
        let relay = Relay::new(transport, consumer, config(retry));
        let stats = relay.stats();

        let start = Instant::now();
        relay.run().await;

        assert_eq!(start.elapsed(), retry * 3);
        // each record posted exactly once, in order
        assert_eq!(sequence_ids(&posts), [0, 1, 2, 3]);
        assert_eq!(stats.failed(), 3);
        assert_eq!(stats.delivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_failure_waits_once() {
        let retry = Duration::from_secs(2);
        let (_producer, consumer) = handoff::channel(1).unwrap();
        let (transport, posts) = Scripted::new([None, Some(302), Some(204)]);
        let mut relay = Relay::new(transport, consumer, config(retry));

        let start = Instant::now();
        let record = || Record::capture(&info(1, &[0, 0])).unwrap();

        assert_eq!(relay.relay(record()).await, Delivery::Failed);
        assert_eq!(start.elapsed(), retry);

        assert_eq!(
            relay.relay(record()).await,
            Delivery::Rejected(StatusCode::FOUND)
        );
        assert_eq!(start.elapsed(), retry * 2);

        assert_eq!(
            relay.relay(record()).await,
            Delivery::Delivered(StatusCode::NO_CONTENT)
        );
        assert_eq!(start.elapsed(), retry * 2);
        assert_eq!(posts.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unserializable_is_not_posted() {
        let (_producer, consumer) = handoff::channel(1).unwrap();
        let (transport, posts) = Scripted::new([]);
        let mut relay = Relay::new(
            transport,
            consumer,
            RelayConfig {
                capacity: 16,
                ..config(Duration::from_secs(1))
            },
        );

        let start = Instant::now();
        let record = Record::capture(&info(1, &[0, 0])).unwrap();
        assert_eq!(relay.relay(record).await, Delivery::Unserializable);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(posts.lock().unwrap().is_empty());
        assert_eq!(relay.stats().unserializable(), 1);
    }

    /// Random outcomes for every post.
    struct Flaky(StdRng);

    impl Transport for Flaky {
        type Error = Reset;

        async fn post(&mut self, _: &str, _: String) -> Result<StatusCode, Reset> {
            match self.0.gen_range(0..10) {
                0..=1 => Err(Reset),
                2..=3 => Ok(StatusCode::INTERNAL_SERVER_ERROR),
                _ => Ok(StatusCode::CREATED),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn every_record_accounted_for() {
        const N: u16 = 2000;

        let (producer, consumer) = handoff::channel(16).unwrap();
        let counters = producer.counters().clone();
        let relay = Relay::new(
            Flaky(StdRng::seed_from_u64(0x5eed)),
            consumer,
            config(Duration::ZERO),
        );
        let stats = relay.stats();
        let worker = tokio::spawn(relay.run());

        let capture = Capture::new(producer);
        let radio = std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(1);
            let mut payload = [0i8; 128];
            for seq in 0..N {
                rng.fill(&mut payload[..]);
                let len = rng.gen_range(0..=payload.len());
                capture.on_frame(&info(seq, &payload[..len]));
                if seq % 64 == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        });
        tokio::task::spawn_blocking(move || radio.join().unwrap())
            .await
            .unwrap();

        // the capture (and with it the producer) is gone, so the worker drains and stops
        worker.await.unwrap();

        assert_eq!(counters.enqueued() + counters.dropped(), N as usize);
        assert_eq!(
            counters.enqueued(),
            stats.delivered() + stats.failed() + stats.unserializable()
        );
        assert_eq!(stats.unserializable(), 0);
    }
}
