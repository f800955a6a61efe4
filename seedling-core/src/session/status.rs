//! Read-only view of a running session for display purposes.

use chrono::{DateTime, TimeDelta, Utc};

use super::snapshot::{AnnounceEvent, AnnounceSnapshot};

/// Point-in-time copy of everything the status display shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub torrent_name: String,
    pub info_hash: String,
    pub total_size: u64,
    pub piece_size: u64,
    pub client_name: String,
    pub tracker_url: String,
    pub event: AnnounceEvent,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub port: u16,
    pub seeders: u32,
    pub leechers: u32,
    pub interval: u32,
    pub numwant: u32,
    pub announce_count: u64,
    /// Retry rounds the last answered announce needed
    pub last_attempts: u32,
    /// Snapshots from oldest to newest
    pub history: Vec<AnnounceSnapshot>,
    /// Last query string, only kept in debug mode
    pub last_query: Option<String>,
}

impl SessionStatus {
    /// Most recent announce, if any.
    pub fn latest(&self) -> Option<&AnnounceSnapshot> {
        self.history.last()
    }

    /// When the next periodic announce is due.
    pub fn next_announce_at(&self) -> Option<DateTime<Utc>> {
        if self.event == AnnounceEvent::Stopped {
            return None;
        }
        self.latest()
            .map(|snapshot| snapshot.recorded_at() + TimeDelta::seconds(i64::from(self.interval)))
    }

    /// Time left until the next announce, clamped at zero.
    pub fn time_until_next_announce(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.next_announce_at()
            .map(|due| (due - now).max(TimeDelta::zero()))
    }
}
