use anyhow::Context;
use atomic_counter::AtomicCounter;
use clap::Parser;
use radio::{sim::SimRadio, CsiCapture, CsiConfig};
use receiver::{capture::Capture, config::Config, handoff, http::HttpClient, relay::Relay};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::parse();

    let radio = SimRadio::new(config.sim());
    radio
        .start_station(&config.station())
        .context("failed to join network")?;

    let (producer, consumer) =
        handoff::channel(config.queue_depth).context("failed to create CSI queue")?;
    let queue = producer.counters().clone();

    let relay_config = config.relay();
    relay_config
        .check()
        .with_context(|| format!("max body of {} bytes is too small", config.max_body))?;

    let relay = Relay::new(
        HttpClient::new(&config.backend_url, config.timeout()),
        consumer,
        relay_config,
    );
    let relay_stats = relay.stats();
    let mut worker = tokio::spawn(relay.run());

    let capture = Capture::new(producer);
    let capture_failures = capture.failures().clone();
    radio
        .start_capture(&CsiConfig::default(), capture.into_callback())
        .context("failed to enable CSI capture")?;
    info!(label = %config.device_label, "receiver configured, streaming CSI");

    let mut stats = tokio::time::interval(config.stats_interval());
    loop {
        tokio::select! {
            res = &mut worker => {
                res.context("relay worker panicked")?;
                anyhow::bail!("relay worker stopped");
            }
            _ = stats.tick() => {
                info!(
                    enqueued = queue.enqueued(),
                    dropped = queue.dropped(),
                    capture_failed = capture_failures.get(),
                    delivered = relay_stats.delivered(),
                    failed = relay_stats.failed(),
                    unserializable = relay_stats.unserializable(),
                    "pipeline"
                );
            }
        }
    }
}
