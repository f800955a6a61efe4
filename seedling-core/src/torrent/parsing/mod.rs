//! Torrent file parsing.
//!
//! Metadata extraction using the bencode-rs crate, reduced to the fields an
//! announce session needs.

pub mod bencode;
pub mod parser;
pub mod types;

// Re-export public API
pub use parser::BencodeTorrentParser;
pub use types::{TorrentContext, TorrentFile, TorrentParser};
