//! IEEE 802.11 MAC header definitions for the frame the sender injects.
//!
//! References:
//! - IEEE Std 802.11-2020, 9.2.4 "Frame fields" and 9.3.2.1 "Data frame format"
//! - [802.11 frame types (Wikipedia)](https://en.wikipedia.org/wiki/802.11_frame_types)

use macaddr::MacAddr6;

/// Frame type (bits 2..3 of the first frame control byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    Management,
    Control,
    Data,
}

impl FrameType {
    const fn bits(self) -> u8 {
        match self {
            FrameType::Management => 0,
            FrameType::Control => 1,
            FrameType::Data => 2,
        }
    }
}

/// Data frame subtype carrying no payload.
pub const SUBTYPE_NULL: u8 = 0b0100;

bitflags::bitflags! {
    /// Flags (second frame control byte).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        /// Frame is headed for the distribution system.
        const TO_DS = 0x01;
        /// Frame is leaving the distribution system.
        const FROM_DS = 0x02;
        const MORE_FRAGMENTS = 0x04;
        const RETRY = 0x08;
        const POWER_MGMT = 0x10;
        const MORE_DATA = 0x20;
        const PROTECTED = 0x40;
        const ORDER = 0x80;
    }
}

/// Frame control field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameControl {
    pub frame_type: FrameType,
    pub subtype: u8,
    pub flags: FrameFlags,
}

impl FrameControl {
    /// Null data frame towards the distribution system.
    ///
    /// ```
    /// # use csi::ieee80211::FrameControl;
    /// assert_eq!(FrameControl::NULL_TO_DS.to_bytes(), [0x48, 0x01]);
    /// ```
    pub const NULL_TO_DS: Self = Self {
        frame_type: FrameType::Data,
        subtype: SUBTYPE_NULL,
        flags: FrameFlags::TO_DS,
    };

    /// Encodes the field. Protocol version is always 0.
    pub const fn to_bytes(self) -> [u8; 2] {
        [
            (self.subtype & 0x0f) << 4 | self.frame_type.bits() << 2,
            self.flags.bits(),
        ]
    }
}

/// 12-bit sequence number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    pub const MASK: u16 = 0x0fff;

    pub const fn new(value: u16) -> Self {
        Self(value & Self::MASK)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns the following sequence number, wrapping to 0 after 4095.
    pub const fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }

    /// Sequence control field: sequence number in bits 15..4, fragment 0.
    ///
    /// ```
    /// # use csi::ieee80211::SequenceNumber;
    /// assert_eq!(SequenceNumber::new(0x123).control(), 0x1230);
    /// ```
    pub const fn control(self) -> u16 {
        self.0 << 4
    }
}

/// A data-class null frame: 24 bytes of MAC header, no body.
///
/// ```text
/// 0    2    4          10         16         22   24
/// | FC | Dur| Addr1    | Addr2    | Addr3    | SC |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullFrame {
    /// Receiver (peer station).
    pub addr1: MacAddr6,
    /// Transmitter.
    pub addr2: MacAddr6,
    /// BSSID.
    pub addr3: MacAddr6,
    pub sequence: SequenceNumber,
}

impl NullFrame {
    pub const LEN: usize = 24;

    /// Frame from an access point to one of its stations. The AP's address
    /// doubles as the BSSID.
    pub const fn from_ap(peer: MacAddr6, ap: MacAddr6) -> Self {
        Self {
            addr1: peer,
            addr2: ap,
            addr3: ap,
            sequence: SequenceNumber::new(0),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];

        out[0..2].copy_from_slice(&FrameControl::NULL_TO_DS.to_bytes());
        // duration stays zero
        out[4..10].copy_from_slice(self.addr1.as_bytes());
        out[10..16].copy_from_slice(self.addr2.as_bytes());
        out[16..22].copy_from_slice(self.addr3.as_bytes());
        out[22..24].copy_from_slice(&self.sequence.control().to_le_bytes());

        out
    }
}

#[cfg(test)]
mod tests {
    use macaddr::MacAddr6;

    use super::{NullFrame, SequenceNumber};

    #[test]
    fn null_frame_layout() {
        let peer = MacAddr6::new(0x10, 0x11, 0x12, 0x13, 0x14, 0x15);
        let ap = MacAddr6::new(0x20, 0x21, 0x22, 0x23, 0x24, 0x25);
        let mut frame = NullFrame::from_ap(peer, ap);
        frame.sequence = SequenceNumber::new(0xabc);

        let b = frame.to_bytes();
        assert_eq!(b.len(), 24);
        assert_eq!(b[0..4], [0x48, 0x01, 0x00, 0x00]);
        assert_eq!(b[4..10], *peer.as_bytes());
        assert_eq!(b[10..16], *ap.as_bytes());
        assert_eq!(b[16..22], *ap.as_bytes());
        assert_eq!(u16::from_le_bytes([b[22], b[23]]), 0xabc0);
    }

    #[test]
    fn sequence_wraps_after_4096() {
        let start = SequenceNumber::default();
        let mut seq = start;
        for i in 0..4096u16 {
            assert_eq!(seq.get(), i);
            seq = seq.next();
        }
        assert_eq!(seq, start);
        assert_eq!(SequenceNumber::new(0x0fff).next().get(), 0);
    }

    #[test]
    fn sequence_masks_to_12_bits() {
        assert_eq!(SequenceNumber::new(0x1001).get(), 1);
        assert_eq!(SequenceNumber::new(0x0fff).control(), 0xfff0);
    }
}
