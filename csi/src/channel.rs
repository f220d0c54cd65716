//! Radio channel descriptors reported alongside every capture.

/// Position of the secondary 20 MHz channel relative to the primary one.
///
/// HT40 operation bonds the primary channel with a neighbour either above or
/// below it. Legacy 20 MHz operation has no secondary channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecondaryChannel {
    /// 20 MHz only.
    #[default]
    None,
    /// Secondary channel above the primary channel.
    Above,
    /// Secondary channel below the primary channel.
    Below,
}

/// Error returned when the driver reports an unknown secondary channel value.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("invalid secondary channel {0}")]
pub struct InvalidSecondaryChannel(pub u8);

impl TryFrom<u8> for SecondaryChannel {
    type Error = InvalidSecondaryChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Above),
            2 => Ok(Self::Below),
            _ => Err(InvalidSecondaryChannel(value)),
        }
    }
}

impl From<SecondaryChannel> for u8 {
    fn from(value: SecondaryChannel) -> Self {
        match value {
            SecondaryChannel::None => 0,
            SecondaryChannel::Above => 1,
            SecondaryChannel::Below => 2,
        }
    }
}

/// Returns the center frequency in MHz of a 2.4 GHz channel.
///
/// ```
/// # use csi::channel::channel_mhz;
/// assert_eq!(channel_mhz(1), Some(2412));
/// assert_eq!(channel_mhz(13), Some(2472));
/// assert_eq!(channel_mhz(14), Some(2484));
/// assert_eq!(channel_mhz(0), None);
/// ```
pub const fn channel_mhz(channel: u8) -> Option<u32> {
    match channel {
        1..=13 => Some(2407 + 5 * channel as u32),
        // Japan only, off the 5 MHz raster
        14 => Some(2484),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::SecondaryChannel;

    #[test]
    fn secondary_channel_raw() {
        for raw in 0..=2u8 {
            let sc = SecondaryChannel::try_from(raw).unwrap();
            assert_eq!(u8::from(sc), raw);
        }

        assert!(SecondaryChannel::try_from(3).is_err());
    }
}
