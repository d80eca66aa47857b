//! Sluice core — torrent session facade, streaming engine, and piece-aware
//! readers.
//!
//! This crate turns a magnet info-hash into a seekable local byte stream
//! while the download is still running: the engine selects one file of the
//! torrent, biases piece selection toward the playback cursor, and the
//! streaming reader waits for exactly the pieces a read needs.

#![warn(missing_docs)]
#![warn(clippy::too_many_lines)]

pub mod config;
pub mod engine;
pub mod session;
pub mod streaming;
pub mod tracing_setup;

pub use config::SluiceConfig;
pub use engine::{
    EngineError, StartOptions, StreamEngineHandle, TorrentStatus, spawn_idle_sweeper,
    spawn_stream_engine,
};
pub use session::{InfoHash, SessionError, SimulatedSession, TorrentSession};
pub use streaming::{ByteRange, RangeError, StreamError, parse_byte_range};
pub use tracing_setup::init_tracing;

/// Result type for top-level Sluice operations.
pub type Result<T> = std::result::Result<T, SluiceError>;

/// Errors a Sluice process can exit with.
///
/// This is the error type of the composition root: everything the CLI
/// wires together (tracing setup, demo fixtures, the HTTP listener, engine
/// shutdown) funnels into it. Request-path errors never reach this type;
/// the API layer maps those to HTTP statuses directly.
#[derive(Debug, thiserror::Error)]
pub enum SluiceError {
    /// Engine operation failure.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Standard I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
