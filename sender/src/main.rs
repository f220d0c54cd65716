use anyhow::Context;
use clap::Parser;
use radio::{sim::SimRadio, ApEvents};
use sender::{config::Config, link::LinkTracker, stimulus::Stimulus};
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
        .start_ap(&config.soft_ap())
        .context("failed to start access point")?;

    let events = radio
        .ap_events()
        .context("failed to subscribe to association events")?;
    let (tracker, link) = LinkTracker::new();
    tokio::spawn(tracker.run(events));

    if let Some(delay) = config.sim_join() {
        let radio = radio.clone();
        let peer = config.target_mac;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            radio.associate(peer, 1);
        });
    }

    info!(ssid = %config.ssid, "waiting for a station");
    Stimulus::new(radio, config.target_mac, config.tx_interval(), link)
        .run()
        .await
        .context("stimulus stopped")
}
