//! Session command implementation

use seedling_core::config::SeedlingConfig;
use seedling_core::input::InputArgs;
use seedling_core::torrent::{BencodeTorrentParser, HttpTracker, TorrentParser};
use seedling_core::{AnnounceSession, ClientProfile, Result, SessionRunner};
use tokio::sync::watch;

use crate::Cli;

/// Loads the torrent, builds the emulated client and runs the session
/// until the user stops it.
///
/// # Errors
///
/// - `SeedlingError::Torrent` - If the torrent file is unreadable or invalid
/// - `SeedlingError::Emulation` - If the client code is unknown
/// - `SeedlingError::Input` - If a size, speed or port is invalid
/// - `SeedlingError::Session` - If an announce could not be delivered
pub async fn run_session(cli: Cli) -> Result<()> {
    let config = SeedlingConfig::from_env();
    tracing::debug!("Loaded configuration: {:?}", config);

    let torrent = BencodeTorrentParser::new()
        .parse_torrent_file(&cli.torrent)
        .await?;
    tracing::info!(
        "Loaded {} ({} bytes, {} pieces, info hash {})",
        torrent.name,
        torrent.total_size,
        torrent.piece_count(),
        torrent.info_hash
    );

    let mut rng = config.session.seeded_rng();
    let profile = ClientProfile::from_code(&cli.client, &mut rng)?;

    let input = InputArgs {
        initial_downloaded: cli.downloaded,
        initial_uploaded: cli.uploaded,
        download_speed: cli.download_speed,
        upload_speed: cli.upload_speed,
        port: cli.port,
        debug: cli.debug,
    }
    .parse(&torrent)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let tracker =
        HttpTracker::new(torrent.tracker_urls.clone(), &config.network)?.with_stop_signal(stop_rx);
    let session = AnnounceSession::new(torrent, profile, input, tracker, rng, &config.session);

    SessionRunner::new(session, &config.session)
        .with_stop_sender(stop_tx)
        .run()
        .await?;
    Ok(())
}
