//! CSI records handed from the capture callback to the relay worker.
//!
//! The radio driver describes every CSI-bearing frame with a [`CaptureInfo`].
//! The descriptor borrows the driver's buffer and is only valid for the
//! duration of the callback, so [`Record::capture`] copies it into an owned
//! [`Record`] that can be moved across to task context.
//!
//! The payload is laid out as interleaved signed bytes:
//!
//! ```text
//! re[0] im[0] re[1] im[1] ... re[n-1] im[n-1]
//! ```

use std::collections::TryReserveError;

use macaddr::MacAddr6;
use num_complex::Complex;

use crate::channel::SecondaryChannel;

/// Largest CSI payload the radio reports, in bytes.
///
/// L-LTF (64 subcarriers), HT-LTF (64) and STBC HT-LTF2 (64), two bytes each.
pub const MAX_PAYLOAD_LEN: usize = 384;

/// Capture descriptor passed to the CSI callback by the radio driver.
#[derive(Debug, Clone, Copy)]
pub struct CaptureInfo<'a> {
    /// Transmitter MAC address.
    pub source_mac: MacAddr6,
    /// Sequence number of the frame that triggered the capture.
    pub sequence: u16,
    /// Received signal strength indicator (dBm).
    pub rssi: i8,
    /// Noise floor (dBm).
    pub noise_floor: i8,
    /// Primary channel.
    pub channel: u8,
    pub secondary_channel: SecondaryChannel,
    /// Raw CSI bytes, owned by the driver.
    pub payload: &'a [i8],
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("payload of {0} bytes exceeds the maximum CSI length ({MAX_PAYLOAD_LEN})")]
    PayloadTooLong(usize),
    #[error("record allocation failed")]
    Alloc(#[from] TryReserveError),
}

/// An owned copy of one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Driver sequence number. Wraps, and may show gaps.
    pub sequence: u16,
    /// Received signal strength indicator (dBm).
    pub rssi: i8,
    /// Noise floor (dBm).
    pub noise_floor: i8,
    /// Transmitter MAC address.
    pub source_mac: MacAddr6,
    pub channel: u8,
    pub secondary_channel: SecondaryChannel,
    pub(crate) payload: Box<[i8]>,
}

impl Record {
    /// Copies a capture descriptor into a record sized exactly to its payload.
    ///
    /// The allocation is fallible, so this never aborts on memory exhaustion.
    pub fn capture(info: &CaptureInfo<'_>) -> Result<Self, Error> {
        let len = info.payload.len();
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong(len));
        }

        let mut payload = Vec::new();
        payload.try_reserve_exact(len)?;
        payload.extend_from_slice(info.payload);

        Ok(Self {
            sequence: info.sequence,
            rssi: info.rssi,
            noise_floor: info.noise_floor,
            source_mac: info.source_mac,
            channel: info.channel,
            secondary_channel: info.secondary_channel,
            payload: payload.into_boxed_slice(),
        })
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn payload(&self) -> &[i8] {
        &self.payload
    }

    /// Number of complete (real, imaginary) pairs.
    pub fn n_subcarriers(&self) -> usize {
        self.payload.len() / 2
    }

    /// Iterates over the subcarriers in capture order. A trailing odd byte is
    /// skipped.
    ///
    /// ```
    /// # use csi::frame::{CaptureInfo, Record};
    /// # use csi::channel::SecondaryChannel;
    /// # use macaddr::MacAddr6;
    /// let info = CaptureInfo {
    ///     source_mac: MacAddr6::nil(),
    ///     sequence: 0,
    ///     rssi: -50,
    ///     noise_floor: -95,
    ///     channel: 6,
    ///     secondary_channel: SecondaryChannel::None,
    ///     payload: &[1, -2, 3, -4, 5],
    /// };
    /// let record = Record::capture(&info).unwrap();
    /// let pairs: Vec<_> = record.subcarriers().map(|z| (z.re, z.im)).collect();
    /// assert_eq!(pairs, [(1, -2), (3, -4)]);
    /// ```
    pub fn subcarriers(&self) -> impl ExactSizeIterator<Item = Complex<i8>> + '_ {
        self.payload
            .chunks_exact(2)
            .map(|pair| Complex::new(pair[0], pair[1]))
    }
}

/// Formats a MAC address as lowercase, colon separated hex.
///
/// ```
/// # use macaddr::MacAddr6;
/// let mac = MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);
/// assert_eq!(csi::frame::format_mac(&mac), "aa:bb:cc:dd:ee:ff");
/// ```
pub fn format_mac(mac: &MacAddr6) -> String {
    let b = mac.as_bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    )
}

#[cfg(test)]
mod tests {
    use macaddr::MacAddr6;

    use super::{CaptureInfo, Error, Record, MAX_PAYLOAD_LEN};
    use crate::channel::SecondaryChannel;

    fn info(payload: &[i8]) -> CaptureInfo<'_> {
        CaptureInfo {
            source_mac: MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff),
            sequence: 7,
            rssi: -40,
            noise_floor: -90,
            channel: 11,
            secondary_channel: SecondaryChannel::Below,
            payload,
        }
    }

    #[test]
    fn copies_header_and_payload() {
        let payload = [1, 2, -3, -4, 127, -128];
        let record = Record::capture(&info(&payload)).unwrap();

        assert_eq!(record.sequence, 7);
        assert_eq!(record.rssi, -40);
        assert_eq!(record.noise_floor, -90);
        assert_eq!(record.channel, 11);
        assert_eq!(record.secondary_channel, SecondaryChannel::Below);
        assert_eq!(record.payload(), &payload);
        assert_eq!(record.payload_len(), 6);
        assert_eq!(record.n_subcarriers(), 3);
    }

    #[test]
    fn empty_payload() {
        let record = Record::capture(&info(&[])).unwrap();
        assert_eq!(record.n_subcarriers(), 0);
        assert_eq!(record.subcarriers().count(), 0);
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![0i8; MAX_PAYLOAD_LEN + 2];
        assert!(matches!(
            Record::capture(&info(&payload)),
            Err(Error::PayloadTooLong(386))
        ));

        let payload = vec![0i8; MAX_PAYLOAD_LEN];
        assert!(Record::capture(&info(&payload)).is_ok());
    }
}
