//! The engine's internal state machine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::commands::{
    SelectedFile, StartOptions, TorrentLiveStatus, TorrentSnapshot, TorrentStatus,
};
use super::{EngineError, selection};
use crate::config::SluiceConfig;
use crate::session::{
    FilePriority, InfoHash, SessionError, SessionEvent, TorrentHandle, TorrentSession,
};
use crate::streaming::StreamSource;

/// One managed torrent.
struct Torrent {
    handle: TorrentHandle,
    status: TorrentStatus,
    metadata_ready: bool,
    selected: Option<SelectedFile>,
    total_files: Option<usize>,
    requested: StartOptions,
    save_dir: PathBuf,
    last_accessed: Instant,
    paused_by_user: bool,
    error: Option<String>,
}

impl Torrent {
    fn new(
        handle: TorrentHandle,
        save_dir: PathBuf,
        requested: StartOptions,
    ) -> Self {
        Self {
            handle,
            status: TorrentStatus::Loading,
            metadata_ready: false,
            selected: None,
            total_files: None,
            requested,
            save_dir,
            last_accessed: Instant::now(),
            paused_by_user: false,
            error: None,
        }
    }

    fn snapshot(&self, info_hash: InfoHash) -> TorrentSnapshot {
        TorrentSnapshot {
            info_hash,
            status: self.status,
            metadata_ready: self.metadata_ready,
            selected: self.selected.clone(),
            total_files: self.total_files,
            requested: self.requested,
            error: self.error.clone(),
        }
    }
}

/// Owns the torrent table and drives every state transition.
///
/// Only the actor task touches this; callers go through the handle.
pub(super) struct StreamEngine {
    config: SluiceConfig,
    session: Arc<dyn TorrentSession>,
    torrents: HashMap<InfoHash, Torrent>,
    metered: bool,
}

impl StreamEngine {
    pub(super) fn new(config: SluiceConfig, session: Arc<dyn TorrentSession>) -> Self {
        Self {
            config,
            session,
            torrents: HashMap::new(),
            metered: false,
        }
    }

    /// Starts the session and claims its event stream.
    pub(super) async fn start(&mut self) -> Result<mpsc::Receiver<SessionEvent>, SessionError> {
        self.session.start().await?;
        Ok(self.session.take_events().await.unwrap_or_else(|| {
            // Event stream already claimed; run with a closed channel.
            let (_tx, rx) = mpsc::channel(1);
            rx
        }))
    }

    /// Stops the underlying session. Torrent files stay on disk.
    pub(super) async fn stop(&mut self) {
        self.session.stop().await;
        self.torrents.clear();
    }

    /// Ensures a torrent exists for the hash, per the start semantics:
    /// refresh an existing live entry (re-selecting on an episode change),
    /// or attach a fresh magnet, selecting immediately if metadata is
    /// already cached.
    pub(super) async fn start_torrent(
        &mut self,
        info_hash: InfoHash,
        options: StartOptions,
    ) -> Result<TorrentSnapshot, EngineError> {
        let handle_live = match self.torrents.get(&info_hash) {
            Some(torrent) => self.session.find(info_hash).await == Some(torrent.handle),
            None => false,
        };

        if handle_live {
            let mut reselect = false;
            if let Some(torrent) = self.torrents.get_mut(&info_hash) {
                torrent.last_accessed = Instant::now();
                if let (Some(season), Some(episode)) = (options.season, options.episode) {
                    let recorded = (torrent.requested.season, torrent.requested.episode);
                    if recorded != (Some(season), Some(episode)) {
                        torrent.requested.season = Some(season);
                        torrent.requested.episode = Some(episode);
                        reselect = torrent.metadata_ready;
                    }
                }
            }
            if reselect {
                tracing::info!(%info_hash, "episode changed, re-running file selection");
                self.run_file_selection(info_hash).await;
            }
            return self
                .snapshot(info_hash)
                .ok_or(EngineError::UnknownTorrent { info_hash });
        }

        if self.torrents.remove(&info_hash).is_some() {
            tracing::debug!(%info_hash, "dropping torrent entry with stale handle");
        }

        let hex = info_hash.to_string();
        let save_dir = self.config.engine.downloads_root.join(&hex[..20]);
        tokio::fs::create_dir_all(&save_dir).await?;
        let handle = self.session.add_magnet(info_hash, &save_dir).await?;
        self.torrents
            .insert(info_hash, Torrent::new(handle, save_dir, options));
        tracing::info!(%info_hash, "torrent attached");

        // Cached metadata: select synchronously so the caller sees `ready`.
        if self.session.file_storage(handle).await.is_some() {
            self.run_file_selection(info_hash).await;
        }

        self.snapshot(info_hash)
            .ok_or(EngineError::UnknownTorrent { info_hash })
    }

    pub(super) fn snapshot(&self, info_hash: InfoHash) -> Option<TorrentSnapshot> {
        self.torrents
            .get(&info_hash)
            .map(|torrent| torrent.snapshot(info_hash))
    }

    /// Snapshot merged with the session's live counters. Touches
    /// `last_accessed`.
    pub(super) async fn live_status(&mut self, info_hash: InfoHash) -> Option<TorrentLiveStatus> {
        let torrent = self.torrents.get_mut(&info_hash)?;
        torrent.last_accessed = Instant::now();
        let handle = torrent.handle;
        let snapshot = torrent.snapshot(info_hash);
        let live = self.session.status(handle).await.unwrap_or_default();
        Some(TorrentLiveStatus {
            snapshot,
            peers: live.peers,
            seeds: live.seeds,
            download_rate_bps: live.download_rate_bps,
            progress: live.progress,
        })
    }

    pub(super) async fn pause_torrent(&mut self, info_hash: InfoHash) {
        if let Some(torrent) = self.torrents.get_mut(&info_hash) {
            torrent.last_accessed = Instant::now();
            if torrent.status == TorrentStatus::Error {
                return;
            }
            self.session.pause(torrent.handle).await;
            torrent.status = TorrentStatus::Paused;
            torrent.paused_by_user = true;
            tracing::info!(%info_hash, "torrent paused");
        }
    }

    pub(super) async fn resume_torrent(&mut self, info_hash: InfoHash) {
        if self.metered {
            tracing::debug!(%info_hash, "resume ignored while metered");
            return;
        }
        if let Some(torrent) = self.torrents.get_mut(&info_hash) {
            torrent.last_accessed = Instant::now();
            if torrent.status != TorrentStatus::Paused {
                return;
            }
            self.session.resume(torrent.handle).await;
            torrent.status = if torrent.metadata_ready {
                TorrentStatus::Ready
            } else {
                TorrentStatus::Loading
            };
            torrent.paused_by_user = false;
            tracing::info!(%info_hash, "torrent resumed");
        }
    }

    /// Removes the torrent and deletes its save directory.
    pub(super) async fn remove_torrent(&mut self, info_hash: InfoHash) {
        if let Some(torrent) = self.torrents.remove(&info_hash) {
            self.session.remove(torrent.handle).await;
            if let Err(error) = tokio::fs::remove_dir_all(&torrent.save_dir).await {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(%info_hash, %error, "failed to delete save directory");
                }
            }
            tracing::info!(%info_hash, "torrent removed");
        }
    }

    /// Global metered switch: entering pauses every torrent, leaving resumes
    /// the ones the user had not paused themselves. Error torrents are left
    /// alone.
    pub(super) async fn set_metered(&mut self, metered: bool) {
        if self.metered == metered {
            return;
        }
        self.metered = metered;
        tracing::info!(metered, "metered mode changed");
        for torrent in self.torrents.values_mut() {
            if torrent.status == TorrentStatus::Error {
                continue;
            }
            if metered {
                self.session.pause(torrent.handle).await;
                torrent.status = TorrentStatus::Paused;
            } else if !torrent.paused_by_user {
                self.session.resume(torrent.handle).await;
                torrent.status = if torrent.metadata_ready {
                    TorrentStatus::Ready
                } else {
                    TorrentStatus::Loading
                };
            }
        }
    }

    /// Evicts torrents unused for longer than `max_age`. Returns the count.
    pub(super) async fn cleanup_idle(&mut self, max_age: Duration) -> usize {
        let expired: Vec<InfoHash> = self
            .torrents
            .iter()
            .filter(|(_, torrent)| torrent.last_accessed.elapsed() > max_age)
            .map(|(info_hash, _)| *info_hash)
            .collect();
        for info_hash in &expired {
            tracing::info!(%info_hash, "evicting idle torrent");
            self.remove_torrent(*info_hash).await;
        }
        expired.len()
    }

    /// Builds a piece-aware byte source over `[start, end]` of the selected
    /// file.
    pub(super) async fn open_stream(
        &mut self,
        info_hash: InfoHash,
        start: u64,
        end: u64,
    ) -> Result<StreamSource, EngineError> {
        let Some(torrent) = self.torrents.get_mut(&info_hash) else {
            return Err(EngineError::UnknownTorrent { info_hash });
        };
        torrent.last_accessed = Instant::now();
        if torrent.status == TorrentStatus::Error {
            return Err(EngineError::TorrentFailed {
                info_hash,
                message: torrent
                    .error
                    .clone()
                    .unwrap_or_else(|| "torrent failed".to_string()),
            });
        }
        let Some(selected) = torrent.selected.clone() else {
            return Err(EngineError::NotReady { info_hash });
        };

        // The session creates the selected file sparse at full size as soon
        // as priorities apply; anything shorter means it is not there yet.
        let path = torrent.save_dir.join(&selected.path);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() >= selected.size => {}
            _ => return Err(EngineError::NotReady { info_hash }),
        }

        Ok(StreamSource {
            info_hash,
            path,
            file_size: selected.size,
            start,
            end,
            piece_length: selected.piece_length,
            file_offset: selected.offset,
            last_piece: selected.last_piece,
            session: Arc::clone(&self.session),
            config: self.config.streaming.clone(),
        })
    }

    /// Applies one session event to the state machine.
    pub(super) async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::MetadataReceived { info_hash } => {
                // Sessions may redeliver this; selection runs once.
                let fresh = self
                    .torrents
                    .get(&info_hash)
                    .is_some_and(|torrent| !torrent.metadata_ready);
                if fresh {
                    self.run_file_selection(info_hash).await;
                }
            }
            SessionEvent::Finished { info_hash } => {
                // Finished torrents stay streamable; only eviction removes them.
                tracing::info!(%info_hash, "download finished");
            }
            SessionEvent::Error { info_hash, message } => {
                self.mark_error(info_hash, message);
            }
        }
    }

    fn mark_error(&mut self, info_hash: InfoHash, message: String) {
        if let Some(torrent) = self.torrents.get_mut(&info_hash) {
            tracing::warn!(%info_hash, %message, "torrent entered error state");
            torrent.status = TorrentStatus::Error;
            torrent.error = Some(message);
        }
    }

    /// Chooses the file to stream and applies the streaming piece strategy:
    /// single-file priority, sequential range over the file's pieces, and a
    /// deadline boost on the leading window.
    async fn run_file_selection(&mut self, info_hash: InfoHash) {
        let Some((handle, requested)) = self
            .torrents
            .get(&info_hash)
            .map(|torrent| (torrent.handle, torrent.requested))
        else {
            return;
        };
        let Some(storage) = self.session.file_storage(handle).await else {
            tracing::debug!(%info_hash, "metadata signalled but file storage unavailable");
            return;
        };
        let Some(index) = selection::select_file(&storage.files, &requested) else {
            self.mark_error(info_hash, "no selectable file in torrent".to_string());
            return;
        };

        let file = &storage.files[index];
        let mut priorities = vec![FilePriority::Ignore; storage.files.len()];
        priorities[index] = FilePriority::Default;
        self.session.prioritize_files(handle, priorities).await;

        let piece_length = u64::from(storage.piece_length);
        let offset = storage.file_offset(index);
        let first_piece = (offset / piece_length) as u32;
        let last_piece = ((offset + file.size.saturating_sub(1)) / piece_length) as u32;

        self.session.set_sequential_flag(handle, true).await;
        self.session
            .set_sequential_range(handle, first_piece, last_piece)
            .await;

        let engine_config = &self.config.engine;
        let boost = engine_config
            .deadline_boost_window
            .min(last_piece - first_piece + 1);
        for i in 0..boost {
            let deadline =
                engine_config.deadline_boost_base_ms + i * engine_config.deadline_boost_step_ms;
            self.session
                .set_piece_deadline(handle, first_piece + i, deadline)
                .await;
        }

        let name = std::path::Path::new(&file.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&file.path)
            .to_string();
        tracing::info!(
            %info_hash,
            file = %file.path,
            size = file.size,
            first_piece,
            last_piece,
            "selected file for streaming"
        );

        if let Some(torrent) = self.torrents.get_mut(&info_hash) {
            torrent.selected = Some(SelectedFile {
                index,
                path: file.path.clone(),
                name,
                size: file.size,
                offset,
                piece_length,
                first_piece,
                last_piece,
            });
            torrent.total_files = Some(storage.files.len());
            torrent.metadata_ready = true;
            if torrent.status == TorrentStatus::Loading {
                torrent.status = TorrentStatus::Ready;
            }
        }
    }
}
