//! Handle for communicating with the engine actor.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::EngineError;
use super::commands::{
    EngineCommand, StartOptions, TorrentLiveStatus, TorrentSnapshot,
};
use crate::session::InfoHash;
use crate::streaming::StreamSource;

/// Cloneable async API over the engine actor's command channel.
#[derive(Clone)]
pub struct StreamEngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl StreamEngineHandle {
    /// Creates a handle over the given command sender.
    pub fn new(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    /// Ensures a torrent exists for the hash and returns its state.
    ///
    /// Returns promptly; metadata resolution continues in the background.
    /// Supplying a changed `(season, episode)` pair re-runs file selection
    /// on a metadata-ready torrent.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    /// - `EngineError::Session` - the magnet could not be attached
    /// - `EngineError::Io` - the save directory could not be created
    pub async fn start_torrent(
        &self,
        info_hash: InfoHash,
        options: StartOptions,
    ) -> Result<TorrentSnapshot, EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::StartTorrent {
            info_hash,
            options,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)?
    }

    /// Reads a torrent's state machine snapshot, if it exists.
    ///
    /// Never consults the session, so it is safe to poll tightly (the proxy
    /// metadata wait does).
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn state(&self, info_hash: InfoHash) -> Result<Option<TorrentSnapshot>, EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::GetState {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Reads a torrent's snapshot plus live swarm counters.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn live_status(
        &self,
        info_hash: InfoHash,
    ) -> Result<Option<TorrentLiveStatus>, EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::GetLiveStatus {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Pauses a torrent. Silent if the hash is unknown.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn pause_torrent(&self, info_hash: InfoHash) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::PauseTorrent {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Resumes a paused torrent. Ignored while metered mode is on.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn resume_torrent(&self, info_hash: InfoHash) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::ResumeTorrent {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Removes a torrent and deletes its files. Silent if unknown.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn remove_torrent(&self, info_hash: InfoHash) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::RemoveTorrent {
            info_hash,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Switches metered mode for every torrent at once.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn set_metered(&self, metered: bool) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::SetMetered { metered, responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Evicts torrents idle longer than `max_age`. Returns the count.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    pub async fn cleanup_idle(&self, max_age: Duration) -> Result<usize, EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::CleanupIdle { max_age, responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Builds a piece-aware byte source over `[start, end]` of the selected
    /// file. Bounds must already be validated against the file size.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor is gone
    /// - `EngineError::UnknownTorrent` - no torrent for the hash
    /// - `EngineError::NotReady` - metadata or the on-disk file is missing
    /// - `EngineError::TorrentFailed` - the torrent hit a terminal error
    pub async fn open_stream(
        &self,
        info_hash: InfoHash,
        start: u64,
        end: u64,
    ) -> Result<StreamSource, EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::OpenStream {
            info_hash,
            start,
            end,
            responder,
        };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)?
    }

    /// Shuts the actor down, stopping the session.
    ///
    /// # Errors
    /// - `EngineError::Shutdown` - the actor was already gone
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        let cmd = EngineCommand::Shutdown { responder };

        self.sender
            .send(cmd)
            .await
            .map_err(|_| EngineError::Shutdown)?;

        rx.await.map_err(|_| EngineError::Shutdown)
    }

    /// Whether the actor is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
