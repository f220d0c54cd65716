use std::time::Duration;

use clap::Parser;
use macaddr::MacAddr6;
use radio::{sim::SimConfig, SoftApConfig};

/// Hosts an access point and keeps its station supplied with null frames.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Config {
    /// Network name to advertise.
    #[arg(long, env = "CSI_AP_SSID")]
    pub ssid: String,
    /// Network password. Empty for an open network.
    #[arg(long, env = "CSI_AP_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
    #[arg(long, env = "CSI_AP_CHANNEL", default_value_t = 6)]
    pub channel: u8,
    /// Station that receives the null frames.
    #[arg(long, env = "CSI_TARGET_MAC")]
    pub target_mac: MacAddr6,
    /// Base interval between null frames, in milliseconds.
    #[arg(
        long,
        env = "CSI_TX_INTERVAL_MS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub tx_interval_ms: u64,
    /// Delay before the simulated target station associates, in
    /// milliseconds. Never associates if unset.
    #[arg(long, env = "CSI_SIM_JOIN_MS")]
    pub sim_join_ms: Option<u64>,
    /// Frames the simulated transmit buffer holds.
    #[arg(long, env = "CSI_SIM_TX_DEPTH", default_value_t = 8)]
    pub sim_tx_depth: usize,
    /// Simulated airtime per frame, in microseconds.
    #[arg(long, env = "CSI_SIM_AIRTIME_US", default_value_t = 2000)]
    pub sim_airtime_us: u64,
}

impl Config {
    pub fn soft_ap(&self) -> SoftApConfig {
        SoftApConfig::new(&self.ssid, &self.password, self.channel)
    }

    pub fn tx_interval(&self) -> Duration {
        Duration::from_millis(self.tx_interval_ms)
    }

    pub fn sim_join(&self) -> Option<Duration> {
        self.sim_join_ms.map(Duration::from_millis)
    }

    pub fn sim(&self) -> SimConfig {
        SimConfig {
            peer: self.target_mac,
            channel: self.channel,
            // an access point does not capture
            capture_interval: Duration::ZERO,
            tx_depth: self.sim_tx_depth,
            tx_airtime: Duration::from_micros(self.sim_airtime_us),
            ..SimConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::{CommandFactory, Parser};
    use macaddr::MacAddr6;
    use radio::AuthMode;

    use super::Config;

    #[test]
    fn cli_is_consistent() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = Config::try_parse_from([
            "sender",
            "--ssid",
            "csi-lab",
            "--password",
            "correct horse",
            "--target-mac",
            "24:0A:C4:00:00:01",
        ])
        .unwrap();

        assert_eq!(
            config.target_mac,
            MacAddr6::new(0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01)
        );
        assert_eq!(config.tx_interval(), Duration::from_millis(10));
        assert_eq!(config.sim_join(), None);

        let ap = config.soft_ap();
        assert_eq!(ap.channel, 6);
        assert_eq!(ap.max_connection, 2);
        assert_eq!(ap.auth_mode(), AuthMode::Wpa2Psk);
        assert_eq!(config.sim().peer, config.target_mac);
    }

    #[test]
    fn rejects_bad_values() {
        let base = ["sender", "--ssid", "csi-lab"];

        let bad_mac = base.iter().copied().chain(["--target-mac", "24:0a:c4"]);
        assert!(Config::try_parse_from(bad_mac).is_err());

        let zero_interval = base.iter().copied().chain([
            "--target-mac",
            "24:0a:c4:00:00:01",
            "--tx-interval-ms",
            "0",
        ]);
        assert!(Config::try_parse_from(zero_interval).is_err());
    }
}
