//! Announce session state machine.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::SessionError;
use super::history::AnnounceHistory;
use super::snapshot::{AnnounceEvent, AnnounceSnapshot};
use super::status::SessionStatus;
use super::traffic::{bytes_left, next_byte_count};
use crate::config::SessionConfig;
use crate::emulation::ClientProfile;
use crate::input::SessionInput;
use crate::torrent::{TorrentContext, TrackerResponse, TrackerTransport};

/// Peers requested while the session is running.
pub const DEFAULT_NUMWANT: u32 = 200;

/// One simulated seeding session against one tracker.
///
/// Every announce, successful or not, is first recorded in the history and
/// then sent. Operations take `&mut self`, so announces of one session can
/// never overlap.
pub struct AnnounceSession<T: TrackerTransport, R: Rng + Send = ChaCha8Rng> {
    torrent: TorrentContext,
    profile: ClientProfile,
    input: SessionInput,
    tracker: T,
    rng: R,
    event: AnnounceEvent,
    interval: u32,
    numwant: u32,
    seeders: u32,
    leechers: u32,
    announce_count: u64,
    last_attempts: u32,
    history: AnnounceHistory,
    last_query: Option<String>,
}

impl<T: TrackerTransport, R: Rng + Send> AnnounceSession<T, R> {
    /// Creates a session that has not announced yet.
    pub fn new(
        torrent: TorrentContext,
        profile: ClientProfile,
        input: SessionInput,
        tracker: T,
        rng: R,
        config: &SessionConfig,
    ) -> Self {
        Self {
            torrent,
            profile,
            input,
            tracker,
            rng,
            event: AnnounceEvent::Started,
            interval: 0,
            numwant: config.numwant,
            seeders: 0,
            leechers: 0,
            announce_count: 0,
            last_attempts: 0,
            history: AnnounceHistory::new(config.history_capacity),
            last_query: None,
        }
    }

    /// Records the user's starting point and sends the `started` announce.
    ///
    /// The first announce is never retried.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyStarted` - If the session already announced
    /// - `SessionError::Tracker` - If the tracker could not be reached
    pub async fn initialize_and_fire_first(&mut self) -> Result<TrackerResponse, SessionError> {
        if !self.history.is_empty() {
            return Err(SessionError::AlreadyStarted);
        }

        let downloaded = self.input.initial_downloaded;
        let left = bytes_left(downloaded, self.torrent.total_size);
        self.event = AnnounceEvent::Started;
        self.record(downloaded, self.input.initial_uploaded, left);

        tracing::info!(
            "Starting session for {} as {}",
            self.torrent.name,
            self.profile.name()
        );
        self.announce(false).await
    }

    /// Simulates one interval of traffic and sends a periodic announce.
    ///
    /// Periodic announces keep the `started` event and may be retried by
    /// the transport.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionStopped` - If `shutdown` already ran
    /// - `SessionError::EmptyHistory` - If called before the first announce
    /// - `SessionError::Tracker` - If the tracker could not be reached
    pub async fn advance_and_fire_next(&mut self) -> Result<TrackerResponse, SessionError> {
        if self.event == AnnounceEvent::Stopped {
            return Err(SessionError::SessionStopped);
        }

        let last = *self.history.last()?;
        let total = self.torrent.total_size;
        let piece_size = self.torrent.piece_size;
        let elapsed = u64::from(self.interval);

        let downloaded = if last.downloaded() < total {
            next_byte_count(
                &mut self.rng,
                self.input.download_speed,
                last.downloaded(),
                piece_size,
                elapsed,
                total,
            )
        } else {
            total
        };
        let uploaded = next_byte_count(
            &mut self.rng,
            self.input.upload_speed,
            last.uploaded(),
            piece_size,
            elapsed,
            0,
        );
        let left = bytes_left(downloaded, total);

        let (downloaded, uploaded, _) = self.profile.round(downloaded, uploaded, left, piece_size);
        // Reported counters never go backwards, whatever the rounding did.
        let downloaded = downloaded.max(last.downloaded());
        let uploaded = uploaded.max(last.uploaded());
        self.record(downloaded, uploaded, bytes_left(downloaded, total));

        self.announce(true).await
    }

    /// Leaves the swarm with a single `stopped` announce.
    ///
    /// Reports the last byte counts unchanged, asks for no peers and is
    /// never retried. Later periodic announces are rejected.
    ///
    /// # Errors
    ///
    /// - `SessionError::SessionStopped` - If `shutdown` already ran
    /// - `SessionError::EmptyHistory` - If called before the first announce
    /// - `SessionError::Tracker` - If the tracker could not be reached
    pub async fn shutdown(&mut self) -> Result<TrackerResponse, SessionError> {
        if self.event == AnnounceEvent::Stopped {
            return Err(SessionError::SessionStopped);
        }

        let last = *self.history.last()?;
        self.event = AnnounceEvent::Stopped;
        self.numwant = 0;
        self.record(last.downloaded(), last.uploaded(), last.left());

        tracing::info!("Stopping session for {}", self.torrent.name);
        self.announce(false).await
    }

    fn record(&mut self, downloaded: u64, uploaded: u64, left: u64) {
        self.announce_count += 1;
        let snapshot = AnnounceSnapshot::new(
            self.announce_count,
            downloaded,
            uploaded,
            left,
            self.torrent.total_size,
            self.event,
        );
        tracing::debug!(
            "Announce #{}: downloaded={} uploaded={} left={}",
            snapshot.sequence(),
            downloaded,
            uploaded,
            left
        );
        self.history.push(snapshot);
    }

    /// Sends the newest history entry to the tracker.
    async fn announce(&mut self, allow_retry: bool) -> Result<TrackerResponse, SessionError> {
        let last = *self.history.last()?;
        let query = self.build_query(&last);
        tracing::trace!("Announce query: {}", query);

        let result = self
            .tracker
            .announce(&query, self.profile.headers(), allow_retry)
            .await;
        self.last_query = Some(query);

        let response = result.map_err(|e| {
            tracing::error!("Announce #{} failed: {}", last.sequence(), e);
            SessionError::Tracker(e)
        })?;

        self.interval = response.effective_interval();
        self.seeders = response.seeders;
        self.leechers = response.leechers;
        self.last_attempts = response.attempts;
        tracing::debug!(
            "Tracker {} answered: interval={}s seeders={} leechers={}",
            response.tracker_url,
            self.interval,
            self.seeders,
            self.leechers
        );

        Ok(response)
    }

    /// Fills the client's query template for `snapshot`.
    fn build_query(&self, snapshot: &AnnounceSnapshot) -> String {
        let substitutions = [
            ("{infohash}", self.torrent.info_hash.url_encoded()),
            ("{port}", self.input.port.to_string()),
            ("{peerid}", self.profile.peer_id_encoded()),
            ("{uploaded}", snapshot.uploaded().to_string()),
            ("{downloaded}", snapshot.downloaded().to_string()),
            ("{left}", snapshot.left().to_string()),
            ("{key}", self.profile.key().to_string()),
            ("{event}", self.event.as_str().to_string()),
            ("{numwant}", self.numwant.to_string()),
        ];

        substitutions
            .iter()
            .fold(self.profile.query_template().to_string(), |query, (placeholder, value)| {
                query.replace(placeholder, value)
            })
    }

    /// Copies the state shown by the status display.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            torrent_name: self.torrent.name.clone(),
            info_hash: self.torrent.info_hash.to_string(),
            total_size: self.torrent.total_size,
            piece_size: self.torrent.piece_size,
            client_name: self.profile.name().to_string(),
            tracker_url: self.tracker.tracker_url(),
            event: self.event,
            download_speed: self.input.download_speed,
            upload_speed: self.input.upload_speed,
            port: self.input.port,
            seeders: self.seeders,
            leechers: self.leechers,
            interval: self.interval,
            numwant: self.numwant,
            announce_count: self.announce_count,
            last_attempts: self.last_attempts,
            history: self.history.iter().copied().collect(),
            last_query: self.last_query.clone().filter(|_| self.input.debug),
        }
    }

    pub fn event(&self) -> AnnounceEvent {
        self.event
    }

    pub fn is_stopped(&self) -> bool {
        self.event == AnnounceEvent::Stopped
    }

    /// Seconds until the next periodic announce, as last set by the tracker.
    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn numwant(&self) -> u32 {
        self.numwant
    }

    pub fn seeders(&self) -> u32 {
        self.seeders
    }

    pub fn leechers(&self) -> u32 {
        self.leechers
    }

    pub fn announce_count(&self) -> u64 {
        self.announce_count
    }

    pub fn history(&self) -> &AnnounceHistory {
        &self.history
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn torrent(&self) -> &TorrentContext {
        &self.torrent
    }

    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }
}
