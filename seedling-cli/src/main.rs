//! Seedling CLI - Command-line interface
//!
//! Announces a torrent to its tracker as if a real client were seeding it.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use seedling_core::input::DEFAULT_PORT;
use seedling_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "seedling")]
#[command(about = "Simulated seeding against a BitTorrent tracker")]
#[command(version)]
pub struct Cli {
    /// Path to the .torrent file
    #[arg(short, long)]
    torrent: PathBuf,

    /// Initial downloaded amount, a size (e.g. 1.5gb) or a percentage (e.g. 50%)
    #[arg(short, long, default_value = "0%")]
    downloaded: String,

    /// Simulated download speed (e.g. 100kbps, 2mbps)
    #[arg(long = "download-speed", visible_alias = "ds", default_value = "0kbps")]
    download_speed: String,

    /// Initial uploaded amount (e.g. 0b, 512mb)
    #[arg(short, long, default_value = "0b")]
    uploaded: String,

    /// Simulated upload speed (e.g. 100kbps, 2mbps)
    #[arg(long = "upload-speed", visible_alias = "us", default_value = "0kbps")]
    upload_speed: String,

    /// Emulated client
    #[arg(short, long, default_value = "qbit-4.0.3")]
    client: String,

    /// Port announced to the tracker
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Show the last announce query in the status display
    #[arg(long)]
    debug: bool,

    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Directory for the per-run debug log
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    match commands::run_session(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("Session failed: {}", e);
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
