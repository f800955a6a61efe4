//! Main torrent parser implementation

use std::path::Path;

use async_trait::async_trait;

use super::super::TorrentError;
use super::bencode::BencodeParser;
use super::types::{TorrentContext, TorrentParser};

/// Torrent parser backed by bencode-rs.
#[derive(Default)]
pub struct BencodeTorrentParser;

impl BencodeTorrentParser {
    /// Creates new bencode parser instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TorrentParser for BencodeTorrentParser {
    async fn parse_torrent_data(&self, torrent_bytes: &[u8]) -> Result<TorrentContext, TorrentError> {
        BencodeParser::parse_bencode_data(torrent_bytes)
    }

    async fn parse_torrent_file(&self, path: &Path) -> Result<TorrentContext, TorrentError> {
        let file_contents = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", file_contents.len(), path.display());

        self.parse_torrent_data(&file_contents).await
    }
}
