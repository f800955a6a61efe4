//! Announce snapshot value type

use chrono::{DateTime, Utc};

/// Lifecycle event sent with an announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// Session running; also used for periodic announces
    Started,
    /// Session leaving the swarm
    Stopped,
}

impl AnnounceEvent {
    /// Tracker protocol value of the `event` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            AnnounceEvent::Started => "started",
            AnnounceEvent::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte counts reported by one announce.
///
/// Immutable once created; `downloaded + left` always equals the torrent
/// size it was created for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnounceSnapshot {
    sequence: u64,
    downloaded: u64,
    uploaded: u64,
    left: u64,
    percent_downloaded: f32,
    event: AnnounceEvent,
    recorded_at: DateTime<Utc>,
}

impl AnnounceSnapshot {
    /// Creates a snapshot for a torrent of `total_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `downloaded + left != total_size` or `total_size == 0`.
    pub fn new(
        sequence: u64,
        downloaded: u64,
        uploaded: u64,
        left: u64,
        total_size: u64,
        event: AnnounceEvent,
    ) -> Self {
        assert!(total_size > 0, "torrent size must be positive");
        assert_eq!(
            downloaded.checked_add(left),
            Some(total_size),
            "downloaded + left must equal torrent size"
        );

        Self {
            sequence,
            downloaded,
            uploaded,
            left,
            percent_downloaded: (downloaded as f64 / total_size as f64 * 100.0) as f32,
            event,
            recorded_at: Utc::now(),
        }
    }

    /// 1-based position of this announce within the session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    pub fn left(&self) -> u64 {
        self.left
    }

    pub fn percent_downloaded(&self) -> f32 {
        self.percent_downloaded
    }

    pub fn event(&self) -> AnnounceEvent {
        self.event
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Uploaded divided by downloaded, `None` before anything was downloaded.
    pub fn ratio(&self) -> Option<f64> {
        (self.downloaded > 0).then(|| self.uploaded as f64 / self.downloaded as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_fields() {
        let snapshot = AnnounceSnapshot::new(3, 250, 500, 750, 1000, AnnounceEvent::Started);
        assert_eq!(snapshot.sequence(), 3);
        assert_eq!(snapshot.left(), 750);
        assert_eq!(snapshot.percent_downloaded(), 25.0);
        assert_eq!(snapshot.ratio(), Some(2.0));
        assert_eq!(snapshot.event().as_str(), "started");
    }

    #[test]
    fn test_ratio_undefined_without_download() {
        let snapshot = AnnounceSnapshot::new(1, 0, 500, 1000, 1000, AnnounceEvent::Started);
        assert_eq!(snapshot.ratio(), None);
    }

    #[test]
    #[should_panic(expected = "downloaded + left must equal torrent size")]
    fn test_inconsistent_counts_panic() {
        AnnounceSnapshot::new(1, 10, 0, 10, 1000, AnnounceEvent::Started);
    }
}
