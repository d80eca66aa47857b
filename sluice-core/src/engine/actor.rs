//! Actor loop for the stream engine.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::commands::EngineCommand;
use super::core::StreamEngine;
use super::handle::StreamEngineHandle;
use crate::config::SluiceConfig;
use crate::session::TorrentSession;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Spawns the engine actor and returns its handle.
///
/// The actor starts the session, claims its event stream, and then
/// processes commands and session events strictly in arrival order. All
/// engine state is confined to the actor task; the handle can be cloned
/// freely.
pub fn spawn_stream_engine(
    config: SluiceConfig,
    session: Arc<dyn TorrentSession>,
) -> StreamEngineHandle {
    let (sender, receiver) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let engine = StreamEngine::new(config, session);

    tokio::spawn(async move {
        run_actor_loop(engine, receiver).await;
    });

    StreamEngineHandle::new(sender)
}

/// Main message loop: commands and session events, one at a time.
async fn run_actor_loop(mut engine: StreamEngine, mut receiver: mpsc::Receiver<EngineCommand>) {
    let mut events = match engine.start().await {
        Ok(events) => events,
        Err(error) => {
            tracing::error!(%error, "session failed to start, engine not running");
            return;
        }
    };
    tracing::debug!("stream engine actor started");

    loop {
        tokio::select! {
            Some(command) = receiver.recv() => {
                if !handle_command(&mut engine, command).await {
                    break;
                }
            }
            Some(event) = events.recv() => {
                engine.handle_session_event(event).await;
            }
            else => break,
        }
    }

    tracing::debug!("stream engine actor stopped");
}

/// Handles one command. Returns false to shut the actor down.
async fn handle_command(engine: &mut StreamEngine, command: EngineCommand) -> bool {
    match command {
        EngineCommand::StartTorrent {
            info_hash,
            options,
            responder,
        } => {
            let result = engine.start_torrent(info_hash, options).await;
            let _ = responder.send(result);
        }

        EngineCommand::GetState {
            info_hash,
            responder,
        } => {
            let _ = responder.send(engine.snapshot(info_hash));
        }

        EngineCommand::GetLiveStatus {
            info_hash,
            responder,
        } => {
            let result = engine.live_status(info_hash).await;
            let _ = responder.send(result);
        }

        EngineCommand::PauseTorrent {
            info_hash,
            responder,
        } => {
            engine.pause_torrent(info_hash).await;
            let _ = responder.send(());
        }

        EngineCommand::ResumeTorrent {
            info_hash,
            responder,
        } => {
            engine.resume_torrent(info_hash).await;
            let _ = responder.send(());
        }

        EngineCommand::RemoveTorrent {
            info_hash,
            responder,
        } => {
            engine.remove_torrent(info_hash).await;
            let _ = responder.send(());
        }

        EngineCommand::SetMetered { metered, responder } => {
            engine.set_metered(metered).await;
            let _ = responder.send(());
        }

        EngineCommand::CleanupIdle { max_age, responder } => {
            let evicted = engine.cleanup_idle(max_age).await;
            let _ = responder.send(evicted);
        }

        EngineCommand::OpenStream {
            info_hash,
            start,
            end,
            responder,
        } => {
            let result = engine.open_stream(info_hash, start, end).await;
            let _ = responder.send(result);
        }

        EngineCommand::Shutdown { responder } => {
            tracing::debug!("stream engine actor shutting down");
            engine.stop().await;
            let _ = responder.send(());
            return false;
        }
    }
    true
}
