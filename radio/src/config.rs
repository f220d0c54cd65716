//! Interface configuration handed to the driver at startup.

use crate::Error;

/// Authentication mode, derived from whether a password is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wpa2Psk,
}

fn auth_mode(password: &str) -> AuthMode {
    if password.is_empty() {
        AuthMode::Open
    } else {
        AuthMode::Wpa2Psk
    }
}

fn validate_credentials(ssid: &str, password: &str) -> Result<(), Error> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(Error::InvalidSsid(ssid.len()));
    }
    // WPA2 passphrases are 8..=63 ASCII characters
    if !password.is_empty() && !(8..=63).contains(&password.len()) {
        return Err(Error::InvalidPassword(password.len()));
    }
    Ok(())
}

/// Station (client) interface used by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub ssid: String,
    pub password: String,
}

impl StationConfig {
    pub fn auth_mode(&self) -> AuthMode {
        auth_mode(&self.password)
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_credentials(&self.ssid, &self.password)
    }
}

/// Access point interface used by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftApConfig {
    pub ssid: String,
    pub password: String,
    /// 2.4 GHz channel, 1 to 14.
    pub channel: u8,
    pub max_connection: u8,
    /// Beacon interval in time units (1.024 ms).
    pub beacon_interval: u16,
}

impl SoftApConfig {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>, channel: u8) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            channel,
            max_connection: 2,
            beacon_interval: 100,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        auth_mode(&self.password)
    }

    /// Returns the channel's center frequency in MHz.
    pub fn validate(&self) -> Result<u32, Error> {
        validate_credentials(&self.ssid, &self.password)?;
        csi::channel::channel_mhz(self.channel).ok_or(Error::InvalidChannel(self.channel))
    }
}

/// Which training fields the driver derives CSI from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiConfig {
    /// Legacy long training field.
    pub lltf: bool,
    /// HT long training field.
    pub htltf: bool,
    /// Second HT-LTF of STBC frames.
    pub stbc_htltf2: bool,
    /// Merge L-LTF and HT-LTF for HT frames.
    pub ltf_merge: bool,
    /// Smooth adjacent subcarriers.
    pub channel_filter: bool,
    /// Use `shift` instead of automatic scaling.
    pub manual_scale: bool,
    pub shift: u8,
}

impl Default for CsiConfig {
    fn default() -> Self {
        Self {
            lltf: true,
            htltf: true,
            stbc_htltf2: true,
            ltf_merge: true,
            channel_filter: true,
            manual_scale: false,
            shift: 0,
        }
    }
}
