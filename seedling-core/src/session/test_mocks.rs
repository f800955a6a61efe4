//! Mock tracker transport for exercising announce sessions without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::torrent::{TorrentError, TrackerResponse, TrackerTransport};

/// URL reported by the mock tracker.
pub const MOCK_TRACKER_URL: &str = "http://tracker.mock/announce";

/// One announce as seen by the mock tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnnounce {
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub allow_retry: bool,
}

/// Tracker transport that answers from memory and records every request.
///
/// Clones share the recorded requests, so a test can keep one clone while
/// the session owns another.
#[derive(Debug, Clone)]
pub struct MockTrackerTransport {
    interval: u32,
    seeders: u32,
    leechers: u32,
    fail_from: Option<usize>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    recorded: Arc<RwLock<Vec<RecordedAnnounce>>>,
}

impl Default for MockTrackerTransport {
    fn default() -> Self {
        Self::new(1800)
    }
}

impl MockTrackerTransport {
    /// Creates a mock tracker answering every announce with `interval`.
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            seeders: 12,
            leechers: 3,
            fail_from: None,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fails every announce from the zero-based `index` onwards.
    pub fn failing_from(mut self, index: usize) -> Self {
        self.fail_from = Some(index);
        self
    }

    /// Delays every answer, simulating a slow tracker.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Announces received so far, oldest first.
    pub async fn announces(&self) -> Vec<RecordedAnnounce> {
        self.recorded.read().await.clone()
    }

    /// Number of announces received so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerTransport for MockTrackerTransport {
    async fn announce(
        &self,
        query: &str,
        headers: &[(String, String)],
        allow_retry: bool,
    ) -> Result<TrackerResponse, TorrentError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.write().await.push(RecordedAnnounce {
            query: query.to_string(),
            headers: headers.to_vec(),
            allow_retry,
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_from.is_some_and(|from| index >= from) {
            return Err(TorrentError::TrackerConnectionFailed {
                url: MOCK_TRACKER_URL.to_string(),
            });
        }

        Ok(TrackerResponse {
            interval: self.interval,
            min_interval: None,
            tracker_id: None,
            seeders: self.seeders,
            leechers: self.leechers,
            tracker_url: MOCK_TRACKER_URL.to_string(),
            attempts: 1,
        })
    }

    fn tracker_url(&self) -> String {
        MOCK_TRACKER_URL.to_string()
    }
}
