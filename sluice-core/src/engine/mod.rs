//! Torrent engine with an actor-based concurrency model.
//!
//! All engine state lives inside a single actor task; callers interact
//! through the cloneable [`StreamEngineHandle`], which turns method calls
//! into commands with oneshot responders. The actor also pumps the session's
//! event stream, so state transitions and caller operations are serialized
//! without locks.
//!
//! # Architecture
//!
//! - **Actor**: message loop selecting over commands and session events
//! - **Handle**: multi-producer async API over the command channel
//! - **Commands**: the message protocol plus external snapshot types
//! - **Core**: the per-torrent state machine and piece strategy
//! - **Selection**: file choice rules (episode pattern, largest video)

mod actor;
mod commands;
mod core;
mod handle;
mod selection;


use std::time::Duration;

pub use actor::spawn_stream_engine;
pub use commands::{
    SelectedFile, StartOptions, TorrentLiveStatus, TorrentSnapshot, TorrentStatus,
};
pub use handle::StreamEngineHandle;
pub use selection::{VIDEO_EXTENSIONS, episode_pattern, is_video_file};

use crate::session::{InfoHash, SessionError};

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine actor is not running.
    #[error("engine is not running")]
    Shutdown,

    /// No active torrent for the hash.
    #[error("torrent {info_hash} is not active")]
    UnknownTorrent {
        /// The missing torrent.
        info_hash: InfoHash,
    },

    /// Metadata or the selected file is not yet available.
    #[error("torrent {info_hash} is not ready for streaming")]
    NotReady {
        /// The not-yet-ready torrent.
        info_hash: InfoHash,
    },

    /// The torrent hit a terminal session error.
    #[error("torrent {info_hash} failed: {message}")]
    TorrentFailed {
        /// The failed torrent.
        info_hash: InfoHash,
        /// Session-provided description.
        message: String,
    },

    /// Session adapter failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Filesystem failure while managing save directories.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Spawns the periodic idle sweep, evicting torrents unused for `max_age`.
///
/// Runs until the engine shuts down. The first sweep happens one full
/// `interval` after spawn.
pub fn spawn_idle_sweeper(
    handle: StreamEngineHandle,
    interval: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // interval fires immediately once
        loop {
            ticker.tick().await;
            match handle.cleanup_idle(max_age).await {
                Ok(0) => {}
                Ok(evicted) => tracing::info!(evicted, "idle sweep evicted torrents"),
                Err(_) => break,
            }
        }
    })
}
