//! HTTP tracker transport.
//!
//! Sends pre-built announce queries to BEP 3 HTTP trackers with announce-list
//! failover and optional exponential backoff, and decodes bencoded responses.

pub mod client;
pub mod types;

// Re-export public API
pub use client::HttpTracker;
pub use types::{TrackerResponse, TrackerTransport};
