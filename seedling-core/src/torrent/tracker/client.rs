//! HTTP tracker client with failover, backoff and response parsing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::types::{TrackerResponse, TrackerTransport};
use crate::config::NetworkConfig;
use crate::torrent::TorrentError;

/// HTTP tracker transport over every usable URL of a torrent.
///
/// Remembers which URL answered last and starts the next announce there.
/// Retry backoff is cut short once the optional stop flag turns true.
pub struct HttpTracker {
    pub(super) tracker_urls: Vec<String>,
    current: AtomicUsize,
    max_retry_attempts: u32,
    retry_base_delay: Duration,
    retry_max_delay: Duration,
    client: reqwest::Client,
    stop: Option<watch::Receiver<bool>>,
}

impl HttpTracker {
    /// Creates a tracker transport for the given URLs, primary first.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TrackerConnectionFailed` - If no tracker URL was provided
    /// - `TorrentError::Http` - If the HTTP client could not be built
    pub fn new(tracker_urls: Vec<String>, config: &NetworkConfig) -> Result<Self, TorrentError> {
        if tracker_urls.is_empty() {
            return Err(TorrentError::TrackerConnectionFailed {
                url: "No tracker URLs provided".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.tracker_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            tracker_urls,
            current: AtomicUsize::new(0),
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay: config.retry_base_delay,
            retry_max_delay: config.retry_max_delay,
            client,
            stop: None,
        })
    }

    /// Abandons pending retries when `stop` becomes true.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Sleeps `delay` unless the stop flag is raised first.
    ///
    /// Returns `false` when retrying should be abandoned.
    async fn backoff_unless_stopped(&self, delay: Duration) -> bool {
        let Some(mut stop) = self.stop.clone() else {
            tokio::time::sleep(delay).await;
            return true;
        };

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            if *stop.borrow_and_update() {
                return false;
            }
            tokio::select! {
                () = &mut sleep => return true,
                changed = stop.changed() => {
                    if changed.is_err() {
                        (&mut sleep).await;
                        return true;
                    }
                }
            }
        }
    }

    /// Appends the query to a tracker URL, respecting an existing query part.
    pub(super) fn build_announce_url(tracker_url: &str, query: &str) -> String {
        let separator = if tracker_url.contains('?') { '&' } else { '?' };
        format!("{tracker_url}{separator}{query}")
    }

    /// Backoff before retry round `round` (1-based), doubling up to the cap.
    pub(super) fn backoff_delay(&self, round: u32) -> Duration {
        let factor = 2u32.saturating_pow(round.saturating_sub(1));
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }

    /// One GET against one tracker URL.
    async fn announce_once(
        &self,
        tracker_url: &str,
        query: &str,
        headers: &[(String, String)],
    ) -> Result<TrackerResponse, TorrentError> {
        let url = Self::build_announce_url(tracker_url, query);
        tracing::debug!("Announcing to tracker: {}", tracker_url);
        tracing::trace!("Announce request: {}", url);

        let mut request = self.client.get(&url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("HTTP request to {} failed: {}", tracker_url, e);
            if e.is_timeout() {
                TorrentError::TrackerTimeout {
                    url: tracker_url.to_string(),
                }
            } else {
                TorrentError::TrackerConnectionFailed {
                    url: tracker_url.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Tracker {} returned error status: {}", tracker_url, status);
            return Err(match status.as_u16() {
                404 => TorrentError::TorrentNotFoundOnTracker {
                    url: tracker_url.to_string(),
                },
                500..=599 => TorrentError::TrackerServerError {
                    url: tracker_url.to_string(),
                    status: status.as_u16(),
                },
                _ => TorrentError::TrackerConnectionFailed {
                    url: tracker_url.to_string(),
                },
            });
        }

        let response_bytes = response.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read response body from {}: {}", tracker_url, e);
            TorrentError::TrackerConnectionFailed {
                url: format!("Failed to read response body: {e}"),
            }
        })?;

        let mut parsed = Self::parse_announce_response(&response_bytes)?;
        parsed.tracker_url = tracker_url.to_string();
        Ok(parsed)
    }

    /// Parse tracker response from bencode data
    ///
    /// # Errors
    /// - `TorrentError::TrackerRejected` - Tracker sent a failure reason
    /// - `TorrentError::ProtocolError` - Malformed response or missing interval
    pub(super) fn parse_announce_response(
        response_bytes: &[u8],
    ) -> Result<TrackerResponse, TorrentError> {
        let parsed =
            bencode_rs::Value::parse(response_bytes).map_err(|e| TorrentError::ProtocolError {
                message: format!("Failed to parse tracker response: {e:?}"),
            })?;

        let Some(bencode_rs::Value::Dictionary(dict)) = parsed.first() else {
            return Err(TorrentError::ProtocolError {
                message: "Invalid tracker response format".to_string(),
            });
        };

        if let Some(bencode_rs::Value::Bytes(failure_reason)) =
            dict.get(b"failure reason".as_slice())
        {
            return Err(TorrentError::TrackerRejected {
                reason: String::from_utf8_lossy(failure_reason).to_string(),
            });
        }

        let count = |key: &[u8]| match dict.get(key) {
            Some(bencode_rs::Value::Integer(val)) => u32::try_from(*val).ok(),
            _ => None,
        };

        let interval = count(b"interval").ok_or_else(|| TorrentError::ProtocolError {
            message: "Missing interval in tracker response".to_string(),
        })?;

        let tracker_id = match dict.get(b"tracker id".as_slice()) {
            Some(bencode_rs::Value::Bytes(id_bytes)) => {
                Some(String::from_utf8_lossy(id_bytes).to_string())
            }
            _ => None,
        };

        Ok(TrackerResponse {
            interval,
            min_interval: count(b"min interval"),
            tracker_id,
            seeders: count(b"complete").unwrap_or(0),
            leechers: count(b"incomplete").unwrap_or(0),
            tracker_url: String::new(),
            attempts: 1,
        })
    }
}

#[async_trait]
impl TrackerTransport for HttpTracker {
    async fn announce(
        &self,
        query: &str,
        headers: &[(String, String)],
        allow_retry: bool,
    ) -> Result<TrackerResponse, TorrentError> {
        let rounds = if allow_retry {
            self.max_retry_attempts + 1
        } else {
            1
        };
        let start = self.current.load(Ordering::Relaxed);
        let mut last_error = None;

        for round in 0..rounds {
            if round > 0 {
                let delay = self.backoff_delay(round);
                tracing::warn!(
                    "All trackers failed, retry {}/{} in {:?}",
                    round,
                    self.max_retry_attempts,
                    delay
                );
                if !self.backoff_unless_stopped(delay).await {
                    tracing::info!("Stop requested, abandoning tracker retries");
                    break;
                }
            }

            for offset in 0..self.tracker_urls.len() {
                let index = (start + offset) % self.tracker_urls.len();
                let tracker_url = &self.tracker_urls[index];

                match self.announce_once(tracker_url, query, headers).await {
                    Ok(mut response) => {
                        self.current.store(index, Ordering::Relaxed);
                        response.attempts = round + 1;
                        tracing::info!(
                            "Tracker {} responded: seeders={}, leechers={}, interval={}s",
                            tracker_url,
                            response.seeders,
                            response.leechers,
                            response.interval
                        );
                        return Ok(response);
                    }
                    Err(e) => {
                        tracing::warn!("Tracker {} failed: {}", tracker_url, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(
            last_error.unwrap_or_else(|| TorrentError::TrackerConnectionFailed {
                url: "All tracker URLs failed".to_string(),
            }),
        )
    }

    fn tracker_url(&self) -> String {
        let index = self.current.load(Ordering::Relaxed) % self.tracker_urls.len();
        self.tracker_urls[index].clone()
    }
}

#[cfg(test)]
mod tracker_client_tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::SeedlingConfig;

    fn test_network_config() -> NetworkConfig {
        SeedlingConfig::for_testing().network
    }

    /// Serves `connections` canned HTTP responses, returning the base URL
    /// and a handle yielding the raw requests received.
    async fn spawn_tracker(
        body: &'static [u8],
        connections: usize,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        spawn_tracker_with(String::new(), body.to_vec(), connections).await
    }

    /// Like `spawn_tracker`, with extra raw header lines in every response.
    async fn spawn_tracker_with(
        extra_headers: String,
        body: Vec<u8>,
        connections: usize,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..connections {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                requests.push(String::from_utf8_lossy(&buf[..n]).to_string());

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
                    body.len(),
                    extra_headers
                );
                socket.write_all(head.as_bytes()).await.unwrap();
                socket.write_all(&body).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (format!("http://{addr}/announce"), handle)
    }

    #[test]
    fn test_new_requires_urls() {
        let result = HttpTracker::new(Vec::new(), &test_network_config());
        assert!(matches!(
            result,
            Err(TorrentError::TrackerConnectionFailed { .. })
        ));
    }

    #[test]
    fn test_build_announce_url() {
        assert_eq!(
            HttpTracker::build_announce_url("http://t.example.com/announce", "port=1"),
            "http://t.example.com/announce?port=1"
        );
        assert_eq!(
            HttpTracker::build_announce_url("http://t.example.com/announce?passkey=ab", "port=1"),
            "http://t.example.com/announce?passkey=ab&port=1"
        );
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = NetworkConfig {
            retry_base_delay: Duration::from_secs(5),
            retry_max_delay: Duration::from_secs(30),
            ..NetworkConfig::default()
        };
        let tracker =
            HttpTracker::new(vec!["http://t.example.com/announce".to_string()], &config).unwrap();

        assert_eq!(tracker.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(tracker.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(tracker.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(tracker.backoff_delay(4), Duration::from_secs(30));
        assert_eq!(tracker.backoff_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_announce_response_success() {
        let bencode_data =
            b"d8:intervali1800e12:min intervali900e8:completei10e10:incompletei5e5:peers0:e";

        let response = HttpTracker::parse_announce_response(bencode_data).unwrap();
        assert_eq!(response.interval, 1800);
        assert_eq!(response.min_interval, Some(900));
        assert_eq!(response.seeders, 10);
        assert_eq!(response.leechers, 5);
    }

    #[test]
    fn test_parse_announce_response_failure_reason() {
        let result = HttpTracker::parse_announce_response(b"d14:failure reason5:errore");
        assert!(matches!(
            result,
            Err(TorrentError::TrackerRejected { reason }) if reason == "error"
        ));
    }

    #[test]
    fn test_parse_announce_response_missing_interval() {
        let result = HttpTracker::parse_announce_response(b"d8:completei1ee");
        assert!(matches!(
            result,
            Err(TorrentError::ProtocolError { message }) if message.contains("Missing interval")
        ));
    }

    #[test]
    fn test_parse_announce_response_not_dictionary() {
        assert!(HttpTracker::parse_announce_response(b"l4:teste").is_err());
    }

    #[tokio::test]
    async fn test_announce_sends_query_and_headers() {
        let (url, server) = spawn_tracker(b"d8:intervali60e8:completei3e10:incompletei4ee", 1).await;
        let tracker = HttpTracker::new(vec![url.clone()], &test_network_config()).unwrap();

        let headers = vec![("User-Agent".to_string(), "qBittorrent/4.0.3".to_string())];
        let response = tracker
            .announce("port=8999&event=started", &headers, false)
            .await
            .unwrap();

        assert_eq!(response.interval, 60);
        assert_eq!(response.seeders, 3);
        assert_eq!(response.leechers, 4);
        assert_eq!(response.tracker_url, url);
        assert_eq!(response.attempts, 1);

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /announce?port=8999&event=started HTTP/1.1"));
        assert!(requests[0].to_lowercase().contains("user-agent: qbittorrent/4.0.3"));
    }

    #[tokio::test]
    async fn test_announce_fails_over_to_next_tracker() {
        let (url, _server) = spawn_tracker(b"d8:intervali120ee", 1).await;
        let dead = "http://127.0.0.1:1/announce".to_string();
        let tracker = HttpTracker::new(vec![dead, url.clone()], &test_network_config()).unwrap();

        let response = tracker.announce("port=1", &[], false).await.unwrap();
        assert_eq!(response.interval, 120);
        assert_eq!(tracker.tracker_url(), url);
    }

    #[tokio::test]
    async fn test_announce_without_retry_surfaces_error() {
        let tracker = HttpTracker::new(
            vec!["http://127.0.0.1:1/announce".to_string()],
            &test_network_config(),
        )
        .unwrap();

        let result = tracker.announce("port=1", &[], false).await;
        assert!(matches!(
            result,
            Err(TorrentError::TrackerConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_announce_with_retry_exhausts_rounds() {
        let tracker = HttpTracker::new(
            vec!["http://127.0.0.1:1/announce".to_string()],
            &test_network_config(),
        )
        .unwrap();

        let result = tracker.announce("port=1", &[], true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_signal_cuts_retry_backoff_short() {
        let config = NetworkConfig {
            max_retry_attempts: 5,
            retry_base_delay: Duration::from_secs(60),
            retry_max_delay: Duration::from_secs(300),
            ..test_network_config()
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let tracker = HttpTracker::new(vec!["http://127.0.0.1:1/announce".to_string()], &config)
            .unwrap()
            .with_stop_signal(stop_rx);

        let announce = tokio::spawn(async move { tracker.announce("port=1", &[], true).await });
        tokio::time::sleep(Duration::from_millis(200)).await;
        stop_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), announce)
            .await
            .expect("retries should stop without waiting out the backoff")
            .unwrap();
        assert!(matches!(
            result,
            Err(TorrentError::TrackerConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_already_stopped_tracker_still_tries_once() {
        let (url, _server) = spawn_tracker(b"d8:intervali30ee", 1).await;
        let (_stop_tx, stop_rx) = watch::channel(true);
        let tracker = HttpTracker::new(vec![url], &test_network_config())
            .unwrap()
            .with_stop_signal(stop_rx);

        let response = tracker.announce("port=1", &[], true).await.unwrap();
        assert_eq!(response.interval, 30);
    }

    /// Wraps `data` in a zlib stream made of one stored block.
    fn zlib_stored(data: &[u8]) -> Vec<u8> {
        let len = u16::try_from(data.len()).unwrap();
        let mut out = vec![0x78, 0x01, 0x01];
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(data);

        let (mut a, mut b) = (1u32, 0u32);
        for &byte in data {
            a = (a + u32::from(byte)) % 65_521;
            b = (b + a) % 65_521;
        }
        out.extend_from_slice(&((b << 16) | a).to_be_bytes());
        out
    }

    #[tokio::test]
    async fn test_deflate_encoded_response_is_decoded() {
        let body = zlib_stored(b"d8:intervali900e8:completei7ee");
        let (url, _server) =
            spawn_tracker_with("Content-Encoding: deflate\r\n".to_string(), body, 1).await;
        let tracker = HttpTracker::new(vec![url], &test_network_config()).unwrap();

        let headers = vec![(
            "Accept-Encoding".to_string(),
            "gzip;q=1.0, deflate, identity".to_string(),
        )];
        let response = tracker.announce("port=1", &headers, false).await.unwrap();
        assert_eq!(response.interval, 900);
        assert_eq!(response.seeders, 7);
    }
}
