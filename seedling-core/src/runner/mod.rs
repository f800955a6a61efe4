//! Drives an announce session: periodic announces, status display and
//! graceful shutdown on termination signals.

pub mod display;
pub mod signal;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, watch};

pub use display::{DisplayHandle, StatusDisplay};
pub use signal::TerminationListener;

use crate::config::SessionConfig;
use crate::session::{AnnounceSession, SessionError, SessionStatus};
use crate::torrent::TrackerTransport;

type SharedSession<T, R> = Arc<Mutex<AnnounceSession<T, R>>>;

/// Runs one announce session until it is told to stop or fails.
///
/// The periodic announce task and the final `stopped` announce share the
/// session behind a mutex, so they are serialized: a termination request
/// arriving mid-announce waits for that announce to finish. A transport
/// watching the flag given to [`SessionRunner::with_stop_sender`] abandons
/// its retry backoff once termination is requested, so that wait stays short.
pub struct SessionRunner<T: TrackerTransport, R: Rng + Send> {
    session: SharedSession<T, R>,
    status_refresh: Duration,
    show_display: bool,
    stop: watch::Sender<bool>,
}

impl<T, R> SessionRunner<T, R>
where
    T: TrackerTransport + 'static,
    R: Rng + Send + 'static,
{
    pub fn new(session: AnnounceSession<T, R>, config: &SessionConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            status_refresh: config.status_refresh,
            show_display: true,
            stop: watch::Sender::new(false),
        }
    }

    /// Uses `stop` as the flag raised when termination is requested.
    pub fn with_stop_sender(mut self, stop: watch::Sender<bool>) -> Self {
        self.stop = stop;
        self
    }

    /// Disables the terminal status display.
    pub fn without_display(mut self) -> Self {
        self.show_display = false;
        self
    }

    /// Runs until Ctrl-C or SIGTERM, then leaves the swarm.
    ///
    /// # Errors
    ///
    /// - `SessionError::SignalSetup` - If the signal handlers could not be registered
    /// - `SessionError::Tracker` - If any announce could not be delivered
    pub async fn run(self) -> Result<SessionStatus, SessionError> {
        let listener = TerminationListener::install().map_err(|e| SessionError::SignalSetup {
            reason: e.to_string(),
        })?;
        self.run_until(listener.recv()).await
    }

    /// Runs until `shutdown` resolves, then sends the `stopped` announce.
    ///
    /// Returns the final session status. A failed periodic announce ends
    /// the run immediately without a `stopped` announce. If `shutdown`
    /// resolves during the first announce, that announce completes and is
    /// directly followed by the `stopped` one.
    ///
    /// # Errors
    ///
    /// - `SessionError::Tracker` - If any announce could not be delivered
    /// - `SessionError::TaskFailed` - If the announce task panicked
    pub async fn run_until<F>(self, shutdown: F) -> Result<SessionStatus, SessionError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let session = Arc::clone(&self.session);
        let first = async move {
            let mut session = session.lock().await;
            session.initialize_and_fire_first().await?;
            Ok::<_, SessionError>(session.status())
        };
        tokio::pin!(first);

        let (initial_status, stop_early) = tokio::select! {
            result = &mut first => (result?, false),
            () = &mut shutdown => {
                tracing::info!("Termination requested during the first announce");
                ((&mut first).await?, true)
            }
        };

        let (status_tx, status_rx) = watch::channel(initial_status);
        if stop_early {
            self.stop.send_replace(true);
            return self.leave_swarm(&status_tx).await;
        }

        let display = self
            .show_display
            .then(|| StatusDisplay::new(self.status_refresh).spawn(status_rx));

        let mut announcer = tokio::spawn(announce_loop(
            Arc::clone(&self.session),
            status_tx.clone(),
            self.stop.subscribe(),
        ));

        let outcome = tokio::select! {
            joined = &mut announcer => {
                let result = flatten_join(joined);
                if let Err(e) = &result {
                    tracing::error!("Announce session terminated: {}", e);
                }
                Some(result)
            }
            () = &mut shutdown => None,
        };

        if let Some(display) = display {
            display.stop().await;
        }

        if let Some(result) = outcome {
            result?;
            return Ok(self.session.lock().await.status());
        }

        self.stop.send_replace(true);
        let stopped = self.leave_swarm(&status_tx).await;

        if let Err(e) = flatten_join(announcer.await) {
            tracing::warn!("Periodic announce failed during shutdown: {}", e);
        }

        stopped
    }

    /// Sends the `stopped` announce once the session is free.
    async fn leave_swarm(
        &self,
        status_tx: &watch::Sender<SessionStatus>,
    ) -> Result<SessionStatus, SessionError> {
        println!("Gracefully exiting...");
        tracing::info!("Termination requested, sending stopped announce");

        let mut session = self.session.lock().await;
        let result = session.shutdown().await;
        let status = session.status();
        status_tx.send_replace(status.clone());

        result?;
        println!("Gracefully exited successfully.");
        Ok(status)
    }
}

/// Sleeps for the tracker's interval, then announces, until cancelled.
async fn announce_loop<T, R>(
    session: SharedSession<T, R>,
    status_tx: watch::Sender<SessionStatus>,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), SessionError>
where
    T: TrackerTransport + 'static,
    R: Rng + Send + 'static,
{
    tracing::debug!("Announce loop started");

    loop {
        let interval = session.lock().await.interval().max(1);
        tokio::select! {
            _ = cancel.changed() => break,
            () = tokio::time::sleep(Duration::from_secs(u64::from(interval))) => {}
        }

        let mut guard = session.lock().await;
        if *cancel.borrow() || guard.is_stopped() {
            break;
        }
        let result = guard.advance_and_fire_next().await;
        status_tx.send_replace(guard.status());
        result?;
    }

    tracing::debug!("Announce loop stopped");
    Ok(())
}

fn flatten_join(
    joined: Result<Result<(), SessionError>, tokio::task::JoinError>,
) -> Result<(), SessionError> {
    joined.map_err(|e| SessionError::TaskFailed {
        reason: e.to_string(),
    })?
}
