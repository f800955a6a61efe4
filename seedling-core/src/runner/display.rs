//! Terminal status display refreshed while a session runs.

use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::session::SessionStatus;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Periodically redraws the latest published [`SessionStatus`].
#[derive(Debug, Clone, Copy)]
pub struct StatusDisplay {
    refresh: Duration,
}

/// Running display task.
pub struct DisplayHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl StatusDisplay {
    pub fn new(refresh: Duration) -> Self {
        Self { refresh }
    }

    /// Starts redrawing `status` every refresh period until stopped.
    pub fn spawn(self, mut status: watch::Receiver<SessionStatus>) -> DisplayHandle {
        let (stop, mut stopped) = oneshot::channel();
        let refresh = self.refresh.max(Duration::from_millis(10));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let frame = render(&status.borrow_and_update(), Utc::now());
                        let mut stdout = std::io::stdout().lock();
                        if write!(stdout, "{CLEAR_SCREEN}{frame}").and_then(|()| stdout.flush()).is_err() {
                            tracing::warn!("Status display lost its terminal");
                            break;
                        }
                    }
                }
            }
        });

        DisplayHandle { stop, task }
    }
}

impl DisplayHandle {
    /// Stops redrawing and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::warn!("Status display task ended abnormally: {}", e);
        }
    }
}

/// Renders one frame of the status screen.
pub fn render(status: &SessionStatus, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", status.torrent_name);
    let _ = writeln!(out, "  info hash   {}", status.info_hash);
    let _ = writeln!(
        out,
        "  size        {} ({} per piece)",
        format_bytes(status.total_size),
        format_bytes(status.piece_size)
    );
    let _ = writeln!(out, "  client      {} on port {}", status.client_name, status.port);
    let _ = writeln!(out, "  tracker     {}", status.tracker_url);
    let _ = writeln!(
        out,
        "  speeds      down {} / up {}",
        format_bytes_per_second(status.download_speed),
        format_bytes_per_second(status.upload_speed)
    );
    let _ = writeln!(
        out,
        "  swarm       {} seeders, {} leechers",
        status.seeders, status.leechers
    );
    let _ = writeln!(
        out,
        "  announces   {} sent, interval {}s, numwant {}, last took {} attempt(s)",
        status.announce_count, status.interval, status.numwant, status.last_attempts
    );

    match status.time_until_next_announce(now) {
        Some(remaining) => {
            let due = status
                .next_announce_at()
                .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  next        in {} (at {})",
                format_remaining(remaining.num_seconds()),
                due
            );
        }
        None => {
            let _ = writeln!(out, "  next        none, session {}", status.event);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:>4}  {:>8}  {:>12}  {:>12}  {:>12}  {:>7}  {:<8}",
        "#", "time", "downloaded", "left", "uploaded", "ratio", "event"
    );
    for snapshot in &status.history {
        let ratio = snapshot
            .ratio()
            .map_or_else(|| "-".to_string(), |ratio| format!("{ratio:.2}"));
        let _ = writeln!(
            out,
            "  {:>4}  {:>8}  {:>12}  {:>12}  {:>12}  {:>7}  {:<8}",
            snapshot.sequence(),
            snapshot
                .recorded_at()
                .with_timezone(&Local)
                .format("%H:%M:%S"),
            format!(
                "{} {:.1}%",
                format_bytes(snapshot.downloaded()),
                snapshot.percent_downloaded()
            ),
            format_bytes(snapshot.left()),
            format_bytes(snapshot.uploaded()),
            ratio,
            snapshot.event()
        );
    }

    if let Some(query) = &status.last_query {
        let _ = writeln!(out);
        let _ = writeln!(out, "  last query  {query}");
    }

    out
}

/// Formats a byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}

fn format_bytes_per_second(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

fn format_remaining(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}m{:02}s", seconds / 60, seconds % 60)
}
