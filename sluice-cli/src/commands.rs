//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use sha1::{Digest, Sha1};
use sluice_core::config::SluiceConfig;
use sluice_core::engine::{is_video_file, spawn_idle_sweeper, spawn_stream_engine};
use sluice_core::session::{
    FixtureFile, FixturePayload, InfoHash, SimulatedSession, SwarmFixture,
};
use sluice_core::tracing_setup;
use sluice_server::AppState;
use tracing::Level;

const DEMO_PIECE_LENGTH: u32 = 256 * 1024;
const DEMO_DOWNLOAD_RATE: u64 = 8 * 1024 * 1024;
const DEMO_METADATA_DELAY: Duration = Duration::from_millis(500);

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming engine and control API
    Serve {
        /// Port for the control API
        #[arg(short, long)]
        port: Option<u16>,
        /// Root directory for per-torrent downloads
        #[arg(long)]
        downloads: Option<PathBuf>,
        /// Console log level (error, warn, info, debug, trace)
        #[arg(long, default_value_t = Level::INFO)]
        log_level: Level,
        /// Directory of local media files to expose as simulated swarms
        #[arg(long)]
        demo_media: Option<PathBuf>,
    },
}

/// Dispatches a parsed command.
pub async fn run(command: Commands) -> sluice_core::Result<()> {
    match command {
        Commands::Serve {
            port,
            downloads,
            log_level,
            demo_media,
        } => serve(port, downloads, log_level, demo_media).await,
    }
}

async fn serve(
    port: Option<u16>,
    downloads: Option<PathBuf>,
    log_level: Level,
    demo_media: Option<PathBuf>,
) -> sluice_core::Result<()> {
    tracing_setup::init_tracing(log_level, Path::new("logs"))?;

    let mut config = SluiceConfig::from_env();
    if let Some(port) = port {
        config.api.port = port;
    }
    if let Some(downloads) = downloads {
        config.engine.downloads_root = downloads;
    }

    let session = Arc::new(SimulatedSession::new());
    if let Some(dir) = &demo_media {
        let registered = register_demo_swarms(&session, dir).await?;
        tracing::info!(count = registered, dir = %dir.display(), "registered demo swarms");
    }

    let engine = spawn_stream_engine(config.clone(), session);
    let sweeper = spawn_idle_sweeper(
        engine.clone(),
        config.engine.sweep_interval,
        config.engine.idle_max_age,
    );

    let state = AppState {
        engine: engine.clone(),
        config,
    };
    tokio::select! {
        result = sluice_server::run_server(state) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received, shutting down"),
    }

    sweeper.abort();
    // An error here means the actor died before shutdown; worth reporting.
    engine.shutdown().await?;
    Ok(())
}

/// Registers one simulated swarm per video file in `dir`.
///
/// Each swarm's info-hash is the SHA-1 of the file name, so the same file
/// always streams under the same hash across runs. The hash is logged so it
/// can be pasted into `/start/<hash>`.
async fn register_demo_swarms(
    session: &SimulatedSession,
    dir: &Path,
) -> Result<usize, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut registered = 0;

    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_video_file(&name) {
            continue;
        }
        let size = entry.metadata().await?.len();
        let info_hash = demo_info_hash(&name);

        session.register_swarm(
            SwarmFixture::new(
                info_hash,
                DEMO_PIECE_LENGTH,
                vec![FixtureFile::new(name.clone(), size)],
            )
            .with_metadata_delay(DEMO_METADATA_DELAY)
            .with_download_rate(DEMO_DOWNLOAD_RATE)
            .with_payload(FixturePayload::CopyFrom(entry.path())),
        );
        tracing::info!(%info_hash, file = %name, size, "demo swarm available");
        registered += 1;
    }

    Ok(registered)
}

fn demo_info_hash(name: &str) -> InfoHash {
    let digest = Sha1::digest(name.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest);
    InfoHash::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_hash_is_stable_per_name() {
        let first = demo_info_hash("movie.mkv");
        let second = demo_info_hash("movie.mkv");
        let other = demo_info_hash("other.mkv");
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.to_string().len(), 40);
    }
}
