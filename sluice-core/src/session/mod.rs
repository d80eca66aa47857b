//! Facade over the underlying BitTorrent session library.
//!
//! The engine never talks to a torrent library directly. Everything it needs
//! is expressed by the [`TorrentSession`] trait: magnet attachment, file
//! priorities, sequential ranges, piece deadlines, piece availability, and a
//! typed event stream. A library-backed adapter implements this trait once;
//! the rest of the crate stays library-agnostic.

pub mod simulation;

use std::fmt;
use std::path::Path;

use tokio::sync::mpsc;

pub use simulation::{FixtureFile, FixturePayload, SimulatedSession, SwarmFixture};

/// Fixed tracker list appended to every magnet URI, in order.
pub const TRACKERS: &[&str] = &[
    "udp://opentor.net:6969",
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://open.stealth.si:80/announce",
    "http://open.tracker.cl:1337/announce",
    "udp://tracker.torrent.eu.org:451/announce",
    "udp://zer0day.ch:1337/announce",
    "udp://wepzone.net:6969/announce",
    "udp://tracker.srv00.com:6969/announce",
    "udp://tracker.filemail.com:6969/announce",
    "udp://tracker.dler.org:6969/announce",
    "udp://tracker.bittor.pw:1337/announce",
    "udp://tracker-udp.gbitt.info:80/announce",
    "udp://run.publictracker.xyz:6969/announce",
    "udp://opentracker.io:6969/announce",
    "udp://open.dstud.io:6969/announce",
    "udp://explodie.org:6969/announce",
    "https://tracker.iperson.xyz:443/announce",
    "https://torrent.tracker.durukanbal.com:443/announce",
    "https://cny.fan:443/announce",
    "http://tracker2.dler.org:80/announce",
    "http://tracker.wepzone.net:6969/announce",
];

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte identifier rendered as lowercase hex on every external surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates an InfoHash from a 20-byte hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Parses a 40-character hex string into an InfoHash.
    ///
    /// # Errors
    /// - `SessionError::InvalidInfoHash` - input is not exactly 40 hex digits
    pub fn from_hex(hex: &str) -> Result<Self, SessionError> {
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SessionError::InvalidInfoHash {
                input: hex.to_string(),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| {
                SessionError::InvalidInfoHash {
                    input: hex.to_string(),
                }
            })?;
        }
        Ok(Self(bytes))
    }

    /// Returns a reference to the underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Opaque reference to a torrent attached to the session.
///
/// Carries a generation id so a handle from a removed-and-readded torrent is
/// recognized as stale instead of silently operating on the wrong attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TorrentHandle {
    /// Hash of the torrent this handle refers to.
    pub info_hash: InfoHash,
    /// Attachment generation, unique per `add_magnet` call.
    pub id: u64,
}

/// Download priority for a single file within a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePriority {
    /// Do not download this file.
    Ignore,
    /// Download at normal priority.
    Default,
}

/// One file inside a torrent, as reported by metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Zero-based index within the torrent's file list.
    pub index: usize,
    /// Path relative to the torrent's save directory.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
}

/// File layout of a torrent once metadata is available.
///
/// Files are laid out contiguously in index order; a file's offset within the
/// torrent payload is the sum of the sizes before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    /// All files in the torrent, in index order.
    pub files: Vec<FileEntry>,
    /// Piece size in bytes.
    pub piece_length: u32,
    /// Total payload size in bytes.
    pub total_size: u64,
}

impl FileStorage {
    /// Builds a FileStorage from a file list, computing the total size.
    pub fn new(files: Vec<FileEntry>, piece_length: u32) -> Self {
        let total_size = files.iter().map(|f| f.size).sum();
        Self {
            files,
            piece_length,
            total_size,
        }
    }

    /// Byte offset of a file within the torrent payload.
    pub fn file_offset(&self, index: usize) -> u64 {
        self.files[..index].iter().map(|f| f.size).sum()
    }

    /// Number of pieces in the torrent.
    pub fn piece_count(&self) -> u32 {
        if self.total_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(u64::from(self.piece_length)) as u32
    }
}

/// Live counters for an attached torrent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveStatus {
    /// Connected peers.
    pub peers: u32,
    /// Connected seeds.
    pub seeds: u32,
    /// Current download rate in bytes per second.
    pub download_rate_bps: u64,
    /// Overall download progress in `[0, 1]`.
    pub progress: f64,
    /// Whether metadata has been resolved.
    pub has_metadata: bool,
}

/// Typed events dispatched from the session's alert stream.
///
/// Alert kinds with no mapping here are dropped at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Metadata for a magnet-added torrent has been resolved.
    MetadataReceived {
        /// Torrent the metadata belongs to.
        info_hash: InfoHash,
    },
    /// All wanted pieces of a torrent have been downloaded.
    Finished {
        /// Torrent that finished.
        info_hash: InfoHash,
    },
    /// The session hit a terminal error for a torrent.
    Error {
        /// Torrent the error belongs to.
        info_hash: InfoHash,
        /// Library-provided description.
        message: String,
    },
}

/// Errors surfaced by the session adapter.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An operation was attempted before `start()`.
    #[error("session is not started")]
    NotStarted,

    /// A hex string did not parse as a 40-character info-hash.
    #[error("invalid info hash: {input}")]
    InvalidInfoHash {
        /// The rejected input.
        input: String,
    },

    /// Filesystem failure while attaching or laying out a torrent.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Builds the magnet URI for an info-hash over the fixed tracker list.
pub fn magnet_uri(info_hash: InfoHash) -> String {
    let mut uri = format!("magnet:?xt=urn:btih:{info_hash}");
    for tracker in TRACKERS {
        uri.push_str("&tr=");
        uri.push_str(tracker);
    }
    uri
}

/// Operations the engine needs from the underlying BitTorrent library.
///
/// Implementations are expected to be cheap to call from the engine actor:
/// nothing here should block on the network. Handle-taking operations are
/// no-ops when given a stale handle; staleness is observable through
/// [`TorrentSession::find`] and [`TorrentSession::status`].
#[async_trait::async_trait]
pub trait TorrentSession: Send + Sync {
    /// Initializes the global session. Idempotent.
    ///
    /// # Errors
    /// - `SessionError::Io` - the session could not be brought up
    async fn start(&self) -> Result<(), SessionError>;

    /// Stops the session, detaching every torrent and closing the event
    /// stream.
    async fn stop(&self);

    /// Takes the session's event channel.
    ///
    /// Returns `None` on the second and later calls; exactly one consumer
    /// (the engine's event pump) owns the stream.
    async fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>>;

    /// Attaches a torrent from its magnet URI, saving under `save_dir`.
    ///
    /// Adding an already-attached hash returns the existing handle.
    ///
    /// # Errors
    /// - `SessionError::NotStarted` - called before `start()`
    /// - `SessionError::Io` - save directory could not be used
    async fn add_magnet(
        &self,
        info_hash: InfoHash,
        save_dir: &Path,
    ) -> Result<TorrentHandle, SessionError>;

    /// Looks up the current handle for a hash, if attached.
    async fn find(&self, info_hash: InfoHash) -> Option<TorrentHandle>;

    /// Returns the torrent's file layout, or `None` before metadata.
    async fn file_storage(&self, handle: TorrentHandle) -> Option<FileStorage>;

    /// Sets per-file download priorities, one entry per file.
    async fn prioritize_files(&self, handle: TorrentHandle, priorities: Vec<FilePriority>);

    /// Toggles sequential piece selection.
    async fn set_sequential_flag(&self, handle: TorrentHandle, on: bool);

    /// Restricts sequential selection to `[first, last]` inclusive.
    async fn set_sequential_range(&self, handle: TorrentHandle, first: u32, last: u32);

    /// Asks the session to obtain a piece within `deadline_ms` milliseconds.
    async fn set_piece_deadline(&self, handle: TorrentHandle, piece: u32, deadline_ms: u32);

    /// Whether a piece is complete and verified on disk.
    async fn have_piece(&self, handle: TorrentHandle, piece: u32) -> bool;

    /// Pauses the torrent.
    async fn pause(&self, handle: TorrentHandle);

    /// Resumes a paused torrent.
    async fn resume(&self, handle: TorrentHandle);

    /// Detaches the torrent from the session.
    ///
    /// On-disk data is left in place; deleting it is the caller's decision.
    async fn remove(&self, handle: TorrentHandle);

    /// Re-announces to all trackers immediately.
    async fn force_reannounce(&self, handle: TorrentHandle);

    /// Live counters for the torrent, or `None` for a stale handle.
    async fn status(&self, handle: TorrentHandle) -> Option<LiveStatus>;
}
