//! Receiver side of the testbed: CSI captured by the radio is queued,
//! rendered as JSON and posted to the backend.
//!
//! ```text
//! radio thread ──► capture ──► handoff ──► relay ──► http ──► backend
//! ```

pub mod capture;
pub mod config;
pub mod handoff;
pub mod http;
pub mod relay;
