//! Channel state information (CSI) records as captured by the receiver,
//! the 802.11 frame the sender injects to provoke them, and the JSON
//! document the receiver relays to the backend.

pub mod channel;
pub mod document;
pub mod frame;
pub mod ieee80211;

pub use frame::{CaptureInfo, Record};
