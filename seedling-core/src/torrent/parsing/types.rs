//! Core types for torrent metadata

use std::path::Path;

use async_trait::async_trait;

use super::super::{InfoHash, TorrentError};

/// Immutable view of a torrent needed to run an announce session.
///
/// Loaded once at startup. `total_size` is the upper bound for the
/// downloaded and left counts reported to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentContext {
    pub info_hash: InfoHash,
    pub name: String,
    pub piece_size: u64,
    pub total_size: u64,
    pub files: Vec<TorrentFile>,
    /// HTTP(S) tracker URLs, primary first, deduplicated
    pub tracker_urls: Vec<String>,
}

impl TorrentContext {
    /// Primary tracker URL.
    pub fn main_tracker(&self) -> &str {
        self.tracker_urls
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Number of pieces covering the torrent content.
    pub fn piece_count(&self) -> u64 {
        self.total_size.div_ceil(self.piece_size)
    }
}

/// Individual file within a torrent.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentFile {
    pub path: Vec<String>,
    pub length: u64,
}

/// Abstract torrent parsing interface.
#[async_trait]
pub trait TorrentParser: Send + Sync {
    /// Parses torrent metadata from raw bencode bytes.
    ///
    /// # Errors
    /// - `TorrentError::InvalidTorrentFile` - Malformed bencode or missing fields
    async fn parse_torrent_data(&self, data: &[u8]) -> Result<TorrentContext, TorrentError>;

    /// Parses torrent file from filesystem path.
    ///
    /// # Errors
    /// - `TorrentError::Io` - File could not be read
    /// - `TorrentError::InvalidTorrentFile` - Parsing failure
    async fn parse_torrent_file(&self, path: &Path) -> Result<TorrentContext, TorrentError>;
}
