//! Torrent metadata and tracker communication

pub mod parsing;
pub mod tracker;

use std::fmt;

pub use parsing::{BencodeTorrentParser, TorrentContext, TorrentFile, TorrentParser};
pub use tracker::{HttpTracker, TrackerResponse, TrackerTransport};

/// Torrent identity: SHA-1 of the bencoded `info` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Percent-encodes every byte for use in a tracker query string.
    pub fn url_encoded(&self) -> String {
        self.0.iter().map(|&b| format!("%{b:02X}")).collect()
    }
}

/// Lowercase hex, as shown by clients.
impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Errors that can occur while loading torrents or talking to trackers.
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    #[error("Failed to parse torrent file: {reason}")]
    InvalidTorrentFile { reason: String },

    #[error("Tracker connection failed: {url}")]
    TrackerConnectionFailed { url: String },

    #[error("Tracker request timed out: {url}")]
    TrackerTimeout { url: String },

    #[error("Torrent not registered on tracker: {url}")]
    TorrentNotFoundOnTracker { url: String },

    #[error("Tracker {url} returned server error {status}")]
    TrackerServerError { url: String, status: u16 },

    #[error("Tracker rejected announce: {reason}")]
    TrackerRejected { reason: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("HTTP error")]
    Http(#[from] reqwest::Error),
}
