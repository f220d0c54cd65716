//! Sender side of the testbed: an access point that keeps its one station
//! busy with null frames so the receiver has something to capture.

pub mod config;
pub mod link;
pub mod stimulus;
