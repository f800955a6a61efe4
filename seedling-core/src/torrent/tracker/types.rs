//! Core types for tracker communication

use async_trait::async_trait;

use crate::torrent::TorrentError;

/// Decoded tracker announce response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Seconds until the next announce
    pub interval: u32,
    /// Minimum allowed interval between announces
    pub min_interval: Option<u32>,
    /// Tracker-specific identifier for subsequent requests
    pub tracker_id: Option<String>,
    /// Number of seeders in the swarm
    pub seeders: u32,
    /// Number of leechers in the swarm
    pub leechers: u32,
    /// Tracker URL that answered
    pub tracker_url: String,
    /// Retry rounds needed before this response arrived, starting at 1
    pub attempts: u32,
}

impl TrackerResponse {
    /// Interval the client must wait, honouring `min interval` when the
    /// tracker sends one larger than `interval`.
    pub fn effective_interval(&self) -> u32 {
        self.min_interval
            .map_or(self.interval, |min| self.interval.max(min))
    }
}

/// Transport used by the announce session to reach a tracker.
///
/// The session builds the complete query string itself (the emulated client
/// decides parameter order and encoding), so the transport only appends it
/// to a tracker URL, sends the client's headers and decodes the answer.
#[async_trait]
pub trait TrackerTransport: Send + Sync {
    /// Sends one announce.
    ///
    /// With `allow_retry` the transport may back off and retry before giving
    /// up; without it every tracker URL is tried once.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TrackerConnectionFailed` - If network or HTTP error
    /// - `TorrentError::TrackerRejected` - If the tracker returned a failure reason
    /// - `TorrentError::ProtocolError` - If the response could not be decoded
    async fn announce(
        &self,
        query: &str,
        headers: &[(String, String)],
        allow_retry: bool,
    ) -> Result<TrackerResponse, TorrentError>;

    /// Tracker URL the next announce goes to.
    fn tracker_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(interval: u32, min_interval: Option<u32>) -> TrackerResponse {
        TrackerResponse {
            interval,
            min_interval,
            tracker_id: None,
            seeders: 0,
            leechers: 0,
            tracker_url: String::new(),
            attempts: 1,
        }
    }

    #[test]
    fn test_effective_interval() {
        assert_eq!(response(1800, None).effective_interval(), 1800);
        assert_eq!(response(1800, Some(900)).effective_interval(), 1800);
        assert_eq!(response(60, Some(300)).effective_interval(), 300);
    }
}
