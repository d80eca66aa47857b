//! Command protocol and snapshot types for the engine actor.

use std::time::Duration;

use tokio::sync::oneshot;

use super::EngineError;
use crate::session::InfoHash;
use crate::streaming::StreamSource;

/// Caller hints carried by a start request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Explicit file index within the torrent.
    pub file_index: Option<usize>,
    /// Season number for episode selection.
    pub season: Option<u32>,
    /// Episode number for episode selection.
    pub episode: Option<u32>,
}

/// Lifecycle state of a managed torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    /// Attached, waiting for metadata.
    Loading,
    /// Metadata resolved and a file selected; streamable.
    Ready,
    /// Paused, by the user or by metered mode.
    Paused,
    /// Terminal session error.
    Error,
}

impl TorrentStatus {
    /// External wire name for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            TorrentStatus::Loading => "loading",
            TorrentStatus::Ready => "ready",
            TorrentStatus::Paused => "paused",
            TorrentStatus::Error => "error",
        }
    }
}

/// The file chosen for streaming, with its piece geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Index within the torrent's file list.
    pub index: usize,
    /// Path relative to the torrent's save directory.
    pub path: String,
    /// Base file name, for display and MIME detection.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Byte offset of the file within the torrent payload.
    pub offset: u64,
    /// Piece size in bytes.
    pub piece_length: u64,
    /// First piece overlapping the file.
    pub first_piece: u32,
    /// Last piece overlapping the file.
    pub last_piece: u32,
}

/// Point-in-time view of a managed torrent's state machine.
#[derive(Debug, Clone)]
pub struct TorrentSnapshot {
    /// Torrent identity.
    pub info_hash: InfoHash,
    /// Lifecycle state.
    pub status: TorrentStatus,
    /// Whether metadata has been resolved and selection applied.
    pub metadata_ready: bool,
    /// The chosen file, once selection has run.
    pub selected: Option<SelectedFile>,
    /// File count from metadata.
    pub total_files: Option<usize>,
    /// The caller's selection hints.
    pub requested: StartOptions,
    /// Terminal error description, when `status` is `Error`.
    pub error: Option<String>,
}

/// Snapshot combined with the session's live counters.
#[derive(Debug, Clone)]
pub struct TorrentLiveStatus {
    /// State machine view.
    pub snapshot: TorrentSnapshot,
    /// Connected peers.
    pub peers: u32,
    /// Connected seeds.
    pub seeds: u32,
    /// Download rate in bytes per second.
    pub download_rate_bps: u64,
    /// Overall progress in `[0, 1]`.
    pub progress: f64,
}

/// Commands processed by the engine actor.
///
/// Each command carries a oneshot responder; the actor processes commands
/// strictly in order, so no shared-state locking is needed anywhere in the
/// engine.
pub enum EngineCommand {
    /// Ensure a torrent exists for the hash, possibly re-selecting a file.
    StartTorrent {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Caller selection hints.
        options: StartOptions,
        /// Result channel.
        responder: oneshot::Sender<Result<TorrentSnapshot, EngineError>>,
    },
    /// Read the torrent's state machine without touching the session.
    GetState {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Result channel.
        responder: oneshot::Sender<Option<TorrentSnapshot>>,
    },
    /// Read state plus the session's live counters.
    GetLiveStatus {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Result channel.
        responder: oneshot::Sender<Option<TorrentLiveStatus>>,
    },
    /// Pause a torrent. Silent on unknown hashes.
    PauseTorrent {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Completion channel.
        responder: oneshot::Sender<()>,
    },
    /// Resume a paused torrent. Ignored while metered mode is on.
    ResumeTorrent {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Completion channel.
        responder: oneshot::Sender<()>,
    },
    /// Remove a torrent and delete its files. Silent on unknown hashes.
    RemoveTorrent {
        /// Torrent identity.
        info_hash: InfoHash,
        /// Completion channel.
        responder: oneshot::Sender<()>,
    },
    /// Switch metered mode, pausing or resuming every torrent.
    SetMetered {
        /// New metered state.
        metered: bool,
        /// Completion channel.
        responder: oneshot::Sender<()>,
    },
    /// Evict torrents idle longer than `max_age`.
    CleanupIdle {
        /// Idle threshold.
        max_age: Duration,
        /// Receives the eviction count.
        responder: oneshot::Sender<usize>,
    },
    /// Build a piece-aware byte source over the selected file.
    OpenStream {
        /// Torrent identity.
        info_hash: InfoHash,
        /// First byte, inclusive.
        start: u64,
        /// Last byte, inclusive.
        end: u64,
        /// Result channel.
        responder: oneshot::Sender<Result<StreamSource, EngineError>>,
    },
    /// Stop the actor and the underlying session.
    Shutdown {
        /// Completion channel.
        responder: oneshot::Sender<()>,
    },
}
