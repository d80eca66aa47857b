//! Byte cursor over a selected file that waits for missing pieces.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::StreamError;
use crate::config::StreamingConfig;
use crate::session::{InfoHash, TorrentSession};

/// Everything needed to stream a byte window of a torrent's selected file.
///
/// Built by the engine once preconditions hold (metadata ready, file on
/// disk). The source does not own the torrent: each wait re-resolves the
/// handle by hash and fails the read if the torrent has been removed.
pub struct StreamSource {
    pub(crate) info_hash: InfoHash,
    pub(crate) path: PathBuf,
    pub(crate) file_size: u64,
    pub(crate) start: u64,
    pub(crate) end: u64,
    pub(crate) piece_length: u64,
    pub(crate) file_offset: u64,
    pub(crate) last_piece: u32,
    pub(crate) session: Arc<dyn TorrentSession>,
    pub(crate) config: StreamingConfig,
}

impl StreamSource {
    /// Size of the whole selected file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// First byte of the window, inclusive.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte of the window, inclusive.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Bytes the stream will yield.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Opens the backing file and returns the cursor.
    ///
    /// # Errors
    /// - `StreamError::Io` - the backing file could not be opened
    pub async fn open(self) -> Result<FileStream, StreamError> {
        let file = File::open(&self.path).await?;
        let pos = self.start;
        Ok(FileStream {
            source: self,
            file,
            pos,
        })
    }
}

/// Streaming cursor over `[start, end]` of the selected file.
///
/// Holds exactly one file descriptor; dropping the cursor (client
/// disconnect) releases it and abandons any in-flight piece wait.
pub struct FileStream {
    source: StreamSource,
    file: File,
    pos: u64,
}

impl FileStream {
    /// Reads the next chunk, waiting for its piece if necessary.
    ///
    /// Chunks never span a piece boundary, so bytes are only ever served
    /// from pieces confirmed present.
    ///
    /// # Errors
    /// - `StreamError::PieceTimeout` - the piece did not arrive in time
    /// - `StreamError::TorrentGone` - the torrent was removed mid-stream
    /// - `StreamError::Io` - positional read failed
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.pos > self.source.end {
            return Ok(None);
        }

        let absolute = self.source.file_offset + self.pos;
        let piece = (absolute / self.source.piece_length) as u32;
        self.ensure_piece(piece).await?;

        let piece_end_absolute = (u64::from(piece) + 1) * self.source.piece_length;
        let len = (self.source.config.chunk_size as u64)
            .min(self.source.end - self.pos + 1)
            .min(piece_end_absolute - absolute) as usize;

        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(self.pos)).await?;
        self.file.read_exact(&mut buf).await?;
        self.pos += len as u64;
        Ok(Some(Bytes::from(buf)))
    }

    /// Blocks until `piece` is locally available.
    ///
    /// Deadline-boosts the near horizon for sequential playback, polls
    /// availability, and periodically forces a reannounce while stalled.
    async fn ensure_piece(&self, piece: u32) -> Result<(), StreamError> {
        let source = &self.source;
        let handle = match source.session.find(source.info_hash).await {
            Some(handle) => handle,
            None => {
                return Err(StreamError::TorrentGone {
                    info_hash: source.info_hash,
                });
            }
        };
        if source.session.have_piece(handle, piece).await {
            return Ok(());
        }

        tracing::debug!(info_hash = %source.info_hash, piece, "waiting for piece");
        let horizon = piece
            .saturating_add(source.config.ensure_ahead_pieces)
            .min(source.last_piece);
        for (i, boosted) in (piece..=horizon).enumerate() {
            let deadline = source.config.ensure_deadline_base_ms
                + i as u32 * source.config.ensure_deadline_step_ms;
            source.session.set_piece_deadline(handle, boosted, deadline).await;
        }

        let give_up = Instant::now() + source.config.piece_wait_timeout;
        let mut last_reannounce = Instant::now();
        loop {
            if source.session.find(source.info_hash).await != Some(handle) {
                return Err(StreamError::TorrentGone {
                    info_hash: source.info_hash,
                });
            }
            if source.session.have_piece(handle, piece).await {
                return Ok(());
            }
            if Instant::now() >= give_up {
                tracing::warn!(info_hash = %source.info_hash, piece, "piece wait timed out");
                return Err(StreamError::PieceTimeout { piece });
            }
            if last_reannounce.elapsed() >= source.config.reannounce_interval {
                source.session.force_reannounce(handle).await;
                last_reannounce = Instant::now();
            }
            tokio::time::sleep(source.config.piece_poll_interval).await;
        }
    }

    /// Consumes the cursor into a stream of chunks for an HTTP body.
    pub fn into_byte_stream(
        self,
    ) -> impl futures::Stream<Item = Result<Bytes, StreamError>> + Send {
        futures::stream::try_unfold(self, |mut cursor| async move {
            match cursor.next_chunk().await? {
                Some(chunk) => Ok(Some((chunk, cursor))),
                None => Ok(None),
            }
        })
    }
}
