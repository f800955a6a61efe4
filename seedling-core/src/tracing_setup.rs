//! Tracing setup for Seedling
//!
//! Console output stays quiet while the status display owns the terminal;
//! the complete trace of every announce goes to a per-run log file.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run debug log inside the logs directory.
pub const LOG_FILE_NAME: &str = "seedling-last-run.log";

/// Directory used when no logs directory is given.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Seedling crates log everything to the file; HTTP internals stay at debug.
const FILE_FILTER: &str = "debug,seedling_core=trace,seedling=trace,hyper=info,h2=info";

/// Installs the global subscriber: console at `console_level` (or
/// `RUST_LOG`) on stderr, and a full trace truncated on every run in
/// `logs_dir/seedling-last-run.log`.
///
/// Returns the path of the log file.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the log file cannot be created or a
///   global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let (log_file, log_file_path) = create_log_file(logs_dir)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.as_str()));
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Tracing initialized: console={}, log file={}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// Creates (or truncates) the run log inside `logs_dir`.
fn create_log_file(logs_dir: Option<&Path>) -> std::io::Result<(File, PathBuf)> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new(DEFAULT_LOGS_DIR));
    create_dir_all(logs_path)?;

    let path = logs_path.join(LOG_FILE_NAME);
    let file = File::create(&path)?;
    Ok((file, path))
}

/// Console verbosity selectable with `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    /// Default, keeps the status display readable
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use seedling_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Info.as_tracing_level();
    /// assert_eq!(level, tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tracing_level().as_str().to_ascii_lowercase().as_str())
    }
}
