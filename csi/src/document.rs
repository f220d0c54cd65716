//! JSON documents relayed to the backend.
//!
//! A document is rendered into a buffer of fixed capacity. The subcarrier
//! array is cut short when the next pair would not fit, and the document is
//! always closed, so the output is valid JSON regardless of payload size:
//!
//! ```json
//! {"mac_address":"receiver-1","source_mac":"aa:bb:cc:dd:ee:ff","sequence_id":7,
//!  "timestamp":"2024-01-01T00:00:00Z","rssi":-40,"noise_floor":-90,"csi":[[1,-2],[3,-4]]}
//! ```

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use macaddr::MacAddr6;

use crate::{
    channel::SecondaryChannel,
    frame::{format_mac, Record},
};

/// `strftime` format of the `timestamp` field (UTC, second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Fits a full-length capture with room to spare.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Closes the `csi` array and the object. Always reserved.
const TRAILER: &str = "]}";

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("document header does not fit in {capacity} bytes")]
    HeaderTooLarge { capacity: usize },
}

/// Device label, stored as a quoted and escaped JSON string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label(String);

impl Label {
    pub fn new(label: &str) -> Self {
        Self(serde_json::Value::from(label).to_string())
    }

    /// The label as it appears in the document, quotes included.
    pub fn as_json(&self) -> &str {
        &self.0
    }
}

/// [`fmt::Write`] sink that rejects anything past `limit` bytes.
struct Bounded {
    buf: String,
    limit: usize,
}

impl Bounded {
    /// Writes all of `args` or nothing.
    fn try_write(&mut self, args: fmt::Arguments<'_>) -> bool {
        let mark = self.buf.len();
        if self.write_fmt(args).is_err() {
            self.buf.truncate(mark);
            return false;
        }
        true
    }
}

impl fmt::Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.limit {
            return Err(fmt::Error);
        }
        self.buf.push_str(s);
        Ok(())
    }
}

/// A rendered relay document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    body: String,
    pairs: usize,
    truncated: bool,
}

impl Document {
    /// Renders `record` into at most `capacity` bytes.
    ///
    /// Fails only if the fields preceding the `csi` array do not fit.
    pub fn render(
        record: &Record,
        label: &Label,
        timestamp: DateTime<Utc>,
        capacity: usize,
    ) -> Result<Self, Error> {
        let limit = capacity
            .checked_sub(TRAILER.len())
            .ok_or(Error::HeaderTooLarge { capacity })?;
        let mut w = Bounded {
            buf: String::with_capacity(capacity),
            limit,
        };

        let header = w.try_write(format_args!(
            concat!(
                r#"{{"mac_address":{},"source_mac":"{}","sequence_id":{},"#,
                r#""timestamp":"{}","rssi":{},"noise_floor":{},"csi":["#,
            ),
            label.as_json(),
            format_mac(&record.source_mac),
            record.sequence,
            timestamp.format(TIMESTAMP_FORMAT),
            record.rssi,
            record.noise_floor,
        ));
        if !header {
            return Err(Error::HeaderTooLarge { capacity });
        }

        let mut pairs = 0;
        for z in record.subcarriers() {
            let sep = if pairs == 0 { "" } else { "," };
            if !w.try_write(format_args!("{sep}[{},{}]", z.re, z.im)) {
                break;
            }
            pairs += 1;
        }

        let mut body = w.buf;
        body.push_str(TRAILER);

        Ok(Self {
            body,
            pairs,
            truncated: pairs < record.n_subcarriers(),
        })
    }

    /// Checks that every record can be rendered into `capacity` bytes,
    /// i.e. that the header fits even with the widest field values.
    pub fn check_capacity(label: &Label, capacity: usize) -> Result<(), Error> {
        let widest = Record {
            sequence: u16::MAX,
            rssi: i8::MIN,
            noise_floor: i8::MIN,
            source_mac: MacAddr6::nil(),
            channel: 0,
            secondary_channel: SecondaryChannel::None,
            payload: Box::default(),
        };
        Self::render(&widest, label, Utc::now(), capacity).map(drop)
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Number of subcarrier pairs written.
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// Whether the `csi` array was cut short to fit the capacity.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}
