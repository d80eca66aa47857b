//! Piece-aware byte streaming over a torrent's selected file.
//!
//! The reader treats the selected file as a plain seekable byte range and
//! hides the fact that the bytes arrive as out-of-order pieces: a read that
//! lands on a missing piece deadline-boosts the near horizon and waits for
//! the session to produce it. Range parsing lives here too so the HTTP layer
//! only deals in validated `[start, end]` windows.

mod range;
mod reader;

pub use range::{ByteRange, RangeError, parse_byte_range};
pub use reader::{FileStream, StreamSource};

use crate::session::InfoHash;

/// Errors produced while streaming file bytes.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The 60-second wait for a piece elapsed.
    #[error("timed out waiting for piece {piece}")]
    PieceTimeout {
        /// The piece that never arrived.
        piece: u32,
    },

    /// The torrent was removed while a stream was open.
    #[error("torrent {info_hash} disappeared mid-stream")]
    TorrentGone {
        /// The vanished torrent.
        info_hash: InfoHash,
    },

    /// Reading the backing file failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
