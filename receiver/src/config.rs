use std::time::Duration;

use clap::{builder::RangedU64ValueParser, Parser};
use csi::{
    document::{Label, DEFAULT_CAPACITY},
    frame::MAX_PAYLOAD_LEN,
};
use radio::{sim::SimConfig, StationConfig};

use crate::relay::RelayConfig;

/// Subcarriers that fit in the largest payload the radio reports.
const MAX_SIM_SUBCARRIERS: u64 = (MAX_PAYLOAD_LEN / 2) as u64;

/// Captures CSI from the radio and relays it to the backend.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Config {
    /// Network to join.
    #[arg(long, env = "CSI_WIFI_SSID")]
    pub ssid: String,
    /// Network password. Empty for an open network.
    #[arg(long, env = "CSI_WIFI_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
    /// Backend base URL; documents are posted to `<url>/csi`.
    #[arg(long, env = "CSI_BACKEND_URL")]
    pub backend_url: String,
    /// Label identifying this receiver in every document.
    #[arg(long, env = "CSI_DEVICE_LABEL", default_value = "csi-receiver")]
    pub device_label: String,
    /// Records buffered between capture and relay.
    #[arg(long, env = "CSI_QUEUE_DEPTH", default_value_t = 32)]
    pub queue_depth: usize,
    /// Pause after a failed post, in milliseconds.
    #[arg(long, env = "CSI_HTTP_RETRY_MS", default_value_t = 1000)]
    pub retry_ms: u64,
    /// Request timeout, in milliseconds.
    #[arg(long, env = "CSI_HTTP_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,
    /// Largest document, in bytes. Longer CSI arrays are truncated.
    #[arg(long, env = "CSI_MAX_BODY", default_value_t = DEFAULT_CAPACITY)]
    pub max_body: usize,
    /// Interval of the pipeline statistics log line, in seconds.
    #[arg(long, env = "CSI_STATS_SECS", default_value_t = 10)]
    pub stats_secs: u64,
    /// Simulated capture interval, in milliseconds.
    #[arg(long, env = "CSI_SIM_CAPTURE_MS", default_value_t = 10)]
    pub sim_capture_ms: u64,
    /// Subcarriers per simulated capture.
    #[arg(
        long,
        env = "CSI_SIM_SUBCARRIERS",
        default_value_t = 64,
        value_parser = RangedU64ValueParser::<usize>::new().range(..=MAX_SIM_SUBCARRIERS)
    )]
    pub sim_subcarriers: usize,
}

impl Config {
    pub fn station(&self) -> StationConfig {
        StationConfig {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
        }
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            label: Label::new(&self.device_label),
            retry_delay: Duration::from_millis(self.retry_ms),
            capacity: self.max_body,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_secs.max(1))
    }

    pub fn sim(&self) -> SimConfig {
        SimConfig {
            capture_interval: Duration::from_millis(self.sim_capture_ms),
            subcarriers: self.sim_subcarriers,
            ..SimConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::{CommandFactory, Parser};
    use csi::document::Label;

    use super::Config;

    #[test]
    fn cli_is_consistent() {
        Config::command().debug_assert();
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "receiver",
            "--ssid",
            "lab",
            "--backend-url",
            "http://10.0.0.2:8000",
            "--device-label",
            "rx-7",
            "--queue-depth",
            "64",
            "--retry-ms",
            "250",
            "--timeout-ms",
            "800",
        ])
        .unwrap();

        assert_eq!(config.queue_depth, 64);
        assert_eq!(config.timeout(), Duration::from_millis(800));

        let relay = config.relay();
        assert_eq!(relay.label, Label::new("rx-7"));
        assert_eq!(relay.retry_delay, Duration::from_millis(250));

        let station = config.station();
        assert_eq!(station.ssid, "lab");
    }

    fn parse(extra: &[&str]) -> Result<Config, clap::Error> {
        let base = ["receiver", "--ssid", "lab", "--backend-url", "http://10.0.0.2"];
        Config::try_parse_from(base.iter().chain(extra))
    }

    #[test]
    fn max_body_must_hold_header() {
        let config = parse(&[]).unwrap();
        assert!(config.relay().check().is_ok());

        let config = parse(&["--max-body", "64"]).unwrap();
        assert!(config.relay().check().is_err());

        // longer labels need more room
        let label = "x".repeat(400);
        let config = parse(&["--max-body", "512", "--device-label", &label]).unwrap();
        assert!(config.relay().check().is_err());
    }

    #[test]
    fn sim_subcarriers_fit_payload() {
        assert_eq!(
            parse(&["--sim-subcarriers", "192"]).unwrap().sim().subcarriers,
            192
        );
        assert!(parse(&["--sim-subcarriers", "193"]).is_err());
    }

    #[test]
    fn backend_url_required() {
        // unless the environment provides it
        if std::env::var_os("CSI_BACKEND_URL").is_none() {
            assert!(Config::try_parse_from(["receiver", "--ssid", "lab"]).is_err());
        }
    }
}
