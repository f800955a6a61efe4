//! Announce session: traffic simulation, history and lifecycle

pub mod announce;
pub mod history;
pub mod snapshot;
pub mod status;
pub mod test_mocks;
pub mod traffic;

pub use announce::{AnnounceSession, DEFAULT_NUMWANT};
pub use history::{AnnounceHistory, HistoryError};
pub use snapshot::{AnnounceEvent, AnnounceSnapshot};
pub use status::SessionStatus;

use crate::torrent::TorrentError;

/// Errors that can occur while driving an announce session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Announce failed: {0}")]
    Tracker(TorrentError),

    #[error("No announce recorded yet: {0}")]
    EmptyHistory(#[from] HistoryError),

    #[error("Session already sent its first announce")]
    AlreadyStarted,

    #[error("Session has been stopped")]
    SessionStopped,

    #[error("Failed to install termination signal handlers: {reason}")]
    SignalSetup { reason: String },

    #[error("Session task failed: {reason}")]
    TaskFailed { reason: String },
}
