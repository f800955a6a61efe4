//! Seedling Core - announce session engine for simulated seeding
//!
//! This crate keeps a BitTorrent tracker convinced that a peer is active by
//! periodically announcing fabricated but plausible transfer statistics:
//! torrent metadata decoding, tracker transport, client emulation profiles,
//! the announce session state machine and the runner that drives it.

pub mod config;
pub mod emulation;
pub mod input;
pub mod runner;
pub mod session;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SeedlingConfig;
pub use emulation::{ClientProfile, EmulationError};
pub use input::{InputArgs, InputError, SessionInput};
pub use runner::SessionRunner;
pub use session::{AnnounceSession, SessionError};
pub use torrent::{TorrentContext, TorrentError};

/// Errors that can bubble up from any Seedling subsystem.
///
/// High-level error types representing failures in core functionality.
#[derive(Debug, thiserror::Error)]
pub enum SeedlingError {
    #[error("Torrent error: {0}")]
    Torrent(#[from] TorrentError),

    #[error("Emulation error: {0}")]
    Emulation(#[from] EmulationError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl SeedlingError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            SeedlingError::Torrent(e) => match e {
                TorrentError::InvalidTorrentFile { reason } => {
                    format!("Invalid torrent file: {reason}")
                }
                TorrentError::TrackerConnectionFailed { url } => {
                    format!("Could not connect to tracker: {url}")
                }
                TorrentError::TrackerRejected { reason } => {
                    format!("Tracker rejected the announce: {reason}")
                }
                _ => "Tracker communication failed".to_string(),
            },
            SeedlingError::Emulation(e) => e.to_string(),
            SeedlingError::Input(e) => format!("Invalid input: {e}"),
            SeedlingError::Session(SessionError::Tracker(e)) => {
                format!("Failed to reach the tracker: {e}")
            }
            SeedlingError::Session(_) => "Announce session failed".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SeedlingError::Emulation(_)
                | SeedlingError::Input(_)
                | SeedlingError::Torrent(TorrentError::InvalidTorrentFile { .. })
                | SeedlingError::Torrent(TorrentError::Io(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, SeedlingError>;
