//! Deterministic in-process session backend.
//!
//! Plays the role of a real swarm for development and tests: registered
//! fixtures resolve metadata after a configurable delay, lay their files out
//! as sparse full-size files under the save directory, and complete pieces
//! over time, honoring piece deadlines first and the sequential range second.
//! Unregistered hashes join an empty swarm and never produce metadata, which
//! exercises every not-ready path in the stack.

use std::collections::{BTreeMap, HashMap};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;

use super::{
    FileEntry, FilePriority, FileStorage, InfoHash, LiveStatus, SessionError, SessionEvent,
    TorrentHandle, TorrentSession,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One file inside a swarm fixture.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    /// Path relative to the save directory.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

impl FixtureFile {
    /// Creates a fixture file.
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Where the bytes of a simulated torrent come from.
#[derive(Debug, Clone)]
pub enum FixturePayload {
    /// A deterministic byte pattern derived from the absolute offset.
    Generated,
    /// Bytes copied from a local file, indexed by absolute torrent offset.
    CopyFrom(PathBuf),
}

/// A swarm the simulated session knows how to serve.
#[derive(Debug, Clone)]
pub struct SwarmFixture {
    /// Torrent identity.
    pub info_hash: InfoHash,
    /// Piece size in bytes.
    pub piece_length: u32,
    /// Files in index order.
    pub files: Vec<FixtureFile>,
    /// Time between attachment and metadata resolution.
    pub metadata_delay: Duration,
    /// Download throughput in bytes per second; `None` is unthrottled.
    pub download_rate: Option<u64>,
    /// Byte source for completed pieces.
    pub payload: FixturePayload,
    /// Peer count reported while active.
    pub peers: u32,
    /// Seed count reported while active.
    pub seeds: u32,
}

impl SwarmFixture {
    /// Creates a fixture with immediate metadata and unthrottled download.
    pub fn new(info_hash: InfoHash, piece_length: u32, files: Vec<FixtureFile>) -> Self {
        Self {
            info_hash,
            piece_length,
            files,
            metadata_delay: Duration::ZERO,
            download_rate: None,
            payload: FixturePayload::Generated,
            peers: 4,
            seeds: 2,
        }
    }

    /// Delays metadata resolution.
    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = delay;
        self
    }

    /// Throttles the simulated download.
    pub fn with_download_rate(mut self, bytes_per_second: u64) -> Self {
        self.download_rate = Some(bytes_per_second);
        self
    }

    /// Overrides the byte source.
    pub fn with_payload(mut self, payload: FixturePayload) -> Self {
        self.payload = payload;
        self
    }

    fn storage(&self) -> FileStorage {
        let files = self
            .files
            .iter()
            .enumerate()
            .map(|(index, f)| FileEntry {
                index,
                path: f.path.clone(),
                size: f.size,
            })
            .collect();
        FileStorage::new(files, self.piece_length)
    }
}

/// Deterministic byte at an absolute torrent offset for generated payloads.
fn payload_byte(offset: u64) -> u8 {
    (offset.wrapping_mul(31).wrapping_add(7) % 251) as u8
}

#[derive(Debug)]
struct SimTorrentState {
    storage: Option<FileStorage>,
    have: Vec<bool>,
    deadlines: BTreeMap<u32, u32>,
    sequential: bool,
    sequential_range: Option<(u32, u32)>,
    priorities: Option<Vec<FilePriority>>,
    paused: bool,
    finished_sent: bool,
    reannounces: u64,
}

impl SimTorrentState {
    fn new() -> Self {
        Self {
            storage: None,
            have: Vec::new(),
            deadlines: BTreeMap::new(),
            sequential: false,
            sequential_range: None,
            priorities: None,
            paused: false,
            finished_sent: false,
            reannounces: 0,
        }
    }

    fn piece_wanted(&self, piece: u32) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        let Some(priorities) = &self.priorities else {
            return true;
        };
        let piece_start = u64::from(piece) * u64::from(storage.piece_length);
        let piece_end = (piece_start + u64::from(storage.piece_length)).min(storage.total_size);
        storage.files.iter().any(|file| {
            let offset = storage.file_offset(file.index);
            offset < piece_end
                && piece_start < offset + file.size
                && priorities.get(file.index) == Some(&FilePriority::Default)
        })
    }

    fn next_piece(&self) -> Option<u32> {
        // Deadline-boosted pieces first, tightest deadline wins.
        if let Some((&piece, _)) = self
            .deadlines
            .iter()
            .filter(|&(&p, _)| !self.have.get(p as usize).copied().unwrap_or(true))
            .min_by_key(|&(&p, &ms)| (ms, p))
        {
            return Some(piece);
        }
        if self.sequential {
            if let Some((first, last)) = self.sequential_range {
                for piece in first..=last {
                    if !self.have.get(piece as usize).copied().unwrap_or(true)
                        && self.piece_wanted(piece)
                    {
                        return Some(piece);
                    }
                }
            }
        }
        (0..self.have.len() as u32)
            .find(|&piece| !self.have[piece as usize] && self.piece_wanted(piece))
    }

    fn wanted_progress(&self) -> f64 {
        let wanted: Vec<u32> = (0..self.have.len() as u32)
            .filter(|&p| self.piece_wanted(p))
            .collect();
        if wanted.is_empty() {
            return if self.storage.is_some() { 1.0 } else { 0.0 };
        }
        let done = wanted
            .iter()
            .filter(|&&p| self.have[p as usize])
            .count();
        done as f64 / wanted.len() as f64
    }
}

struct SimTorrent {
    handle: TorrentHandle,
    fixture: Option<SwarmFixture>,
    shared: Arc<SimTorrentShared>,
    task: Option<JoinHandle<()>>,
}

struct SimTorrentShared {
    state: Mutex<SimTorrentState>,
    wake: tokio::sync::Notify,
}

/// In-process [`TorrentSession`] backed by registered swarm fixtures.
pub struct SimulatedSession {
    started: AtomicBool,
    next_handle_id: AtomicU64,
    fixtures: Mutex<HashMap<InfoHash, SwarmFixture>>,
    torrents: AsyncMutex<HashMap<InfoHash, SimTorrent>>,
    event_tx: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    event_rx: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSession {
    /// Creates an empty session with no registered swarms.
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            next_handle_id: AtomicU64::new(1),
            fixtures: Mutex::new(HashMap::new()),
            torrents: AsyncMutex::new(HashMap::new()),
            event_tx: Mutex::new(None),
            event_rx: Mutex::new(None),
        }
    }

    /// Registers a swarm so later `add_magnet` calls for its hash resolve.
    pub fn register_swarm(&self, fixture: SwarmFixture) {
        self.fixtures.lock().insert(fixture.info_hash, fixture);
    }

    /// Number of reannounces requested for a torrent. Test observability.
    pub async fn reannounce_count(&self, info_hash: InfoHash) -> u64 {
        let torrents = self.torrents.lock().await;
        torrents
            .get(&info_hash)
            .map(|t| t.shared.state.lock().reannounces)
            .unwrap_or(0)
    }

    /// Current per-file priorities of a torrent. Test observability.
    pub async fn file_priorities(&self, info_hash: InfoHash) -> Option<Vec<FilePriority>> {
        let torrents = self.torrents.lock().await;
        torrents
            .get(&info_hash)
            .and_then(|t| t.shared.state.lock().priorities.clone())
    }

    /// Pushes a terminal error alert for a torrent, as a failing session
    /// would. Test hook.
    pub async fn inject_error(&self, info_hash: InfoHash, message: impl Into<String>) {
        let sender = self.event_tx.lock().clone();
        if let Some(sender) = sender {
            let _ = sender
                .send(SessionEvent::Error {
                    info_hash,
                    message: message.into(),
                })
                .await;
        }
    }
}

#[async_trait::async_trait]
impl TorrentSession for SimulatedSession {
    async fn start(&self) -> Result<(), SessionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        *self.event_tx.lock() = Some(tx);
        *self.event_rx.lock() = Some(rx);
        Ok(())
    }

    async fn stop(&self) {
        let mut torrents = self.torrents.lock().await;
        for torrent in torrents.values_mut() {
            if let Some(task) = torrent.task.take() {
                task.abort();
            }
        }
        torrents.clear();
        *self.event_tx.lock() = None;
        self.started.store(false, Ordering::SeqCst);
    }

    async fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.event_rx.lock().take()
    }

    async fn add_magnet(
        &self,
        info_hash: InfoHash,
        save_dir: &Path,
    ) -> Result<TorrentHandle, SessionError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(SessionError::NotStarted);
        }
        let mut torrents = self.torrents.lock().await;
        if let Some(existing) = torrents.get(&info_hash) {
            return Ok(existing.handle);
        }

        let handle = TorrentHandle {
            info_hash,
            id: self.next_handle_id.fetch_add(1, Ordering::SeqCst),
        };
        let fixture = self.fixtures.lock().get(&info_hash).cloned();
        let shared = Arc::new(SimTorrentShared {
            state: Mutex::new(SimTorrentState::new()),
            wake: tokio::sync::Notify::new(),
        });
        let events = self.event_tx.lock().clone();

        // Zero-delay fixtures behave like cached metadata: the layout and
        // file list are in place before `add_magnet` returns.
        if let Some(fx) = &fixture {
            if fx.metadata_delay.is_zero() {
                let storage = fx.storage();
                create_layout(&storage, save_dir).await?;
                let mut state = shared.state.lock();
                state.have = vec![false; storage.piece_count() as usize];
                state.storage = Some(storage);
            }
        }

        let task = match (&fixture, events) {
            (Some(fixture), Some(events)) => Some(tokio::spawn(run_swarm(
                fixture.clone(),
                save_dir.to_path_buf(),
                Arc::clone(&shared),
                events,
            ))),
            _ => None,
        };

        tracing::debug!(%info_hash, magnet = %super::magnet_uri(info_hash), "attached torrent");
        torrents.insert(
            info_hash,
            SimTorrent {
                handle,
                fixture,
                shared,
                task,
            },
        );
        Ok(handle)
    }

    async fn find(&self, info_hash: InfoHash) -> Option<TorrentHandle> {
        self.torrents.lock().await.get(&info_hash).map(|t| t.handle)
    }

    async fn file_storage(&self, handle: TorrentHandle) -> Option<FileStorage> {
        let torrents = self.torrents.lock().await;
        let torrent = torrents.get(&handle.info_hash)?;
        if torrent.handle != handle {
            return None;
        }
        torrent.shared.state.lock().storage.clone()
    }

    async fn prioritize_files(&self, handle: TorrentHandle, priorities: Vec<FilePriority>) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().priorities = Some(priorities);
            shared.wake.notify_waiters();
        }
    }

    async fn set_sequential_flag(&self, handle: TorrentHandle, on: bool) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().sequential = on;
            shared.wake.notify_waiters();
        }
    }

    async fn set_sequential_range(&self, handle: TorrentHandle, first: u32, last: u32) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().sequential_range = Some((first, last));
            shared.wake.notify_waiters();
        }
    }

    async fn set_piece_deadline(&self, handle: TorrentHandle, piece: u32, deadline_ms: u32) {
        if let Some(shared) = self.shared_for(handle).await {
            let mut state = shared.state.lock();
            if !state.have.get(piece as usize).copied().unwrap_or(false) {
                state.deadlines.insert(piece, deadline_ms);
            }
            drop(state);
            shared.wake.notify_waiters();
        }
    }

    async fn have_piece(&self, handle: TorrentHandle, piece: u32) -> bool {
        match self.shared_for(handle).await {
            Some(shared) => shared
                .state
                .lock()
                .have
                .get(piece as usize)
                .copied()
                .unwrap_or(false),
            None => false,
        }
    }

    async fn pause(&self, handle: TorrentHandle) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().paused = true;
            shared.wake.notify_waiters();
        }
    }

    async fn resume(&self, handle: TorrentHandle) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().paused = false;
            shared.wake.notify_waiters();
        }
    }

    async fn remove(&self, handle: TorrentHandle) {
        let mut torrents = self.torrents.lock().await;
        let stale = torrents
            .get(&handle.info_hash)
            .is_some_and(|t| t.handle != handle);
        if stale {
            return;
        }
        if let Some(mut torrent) = torrents.remove(&handle.info_hash) {
            if let Some(task) = torrent.task.take() {
                task.abort();
            }
        }
    }

    async fn force_reannounce(&self, handle: TorrentHandle) {
        if let Some(shared) = self.shared_for(handle).await {
            shared.state.lock().reannounces += 1;
        }
    }

    async fn status(&self, handle: TorrentHandle) -> Option<LiveStatus> {
        let torrents = self.torrents.lock().await;
        let torrent = torrents.get(&handle.info_hash)?;
        if torrent.handle != handle {
            return None;
        }
        let state = torrent.shared.state.lock();
        let has_metadata = state.storage.is_some();
        let progress = state.wanted_progress();
        let active = has_metadata && !state.paused && progress < 1.0;
        let (peers, seeds, rate) = match &torrent.fixture {
            Some(fixture) if has_metadata => (
                fixture.peers,
                fixture.seeds,
                if active {
                    fixture.download_rate.unwrap_or(0)
                } else {
                    0
                },
            ),
            _ => (0, 0, 0),
        };
        Some(LiveStatus {
            peers,
            seeds,
            download_rate_bps: rate,
            progress,
            has_metadata,
        })
    }
}

impl SimulatedSession {
    async fn shared_for(&self, handle: TorrentHandle) -> Option<Arc<SimTorrentShared>> {
        let torrents = self.torrents.lock().await;
        let torrent = torrents.get(&handle.info_hash)?;
        if torrent.handle != handle {
            return None;
        }
        Some(Arc::clone(&torrent.shared))
    }
}

/// Per-torrent swarm task: resolve metadata, then complete pieces over time.
async fn run_swarm(
    fixture: SwarmFixture,
    save_dir: PathBuf,
    shared: Arc<SimTorrentShared>,
    events: mpsc::Sender<SessionEvent>,
) {
    let storage = fixture.storage();
    let pre_resolved = shared.state.lock().storage.is_some();
    if !pre_resolved {
        tokio::time::sleep(fixture.metadata_delay).await;
        if let Err(error) = create_layout(&storage, &save_dir).await {
            tracing::warn!(info_hash = %fixture.info_hash, %error, "fixture layout failed");
            let _ = events
                .send(SessionEvent::Error {
                    info_hash: fixture.info_hash,
                    message: error.to_string(),
                })
                .await;
            return;
        }
        let mut state = shared.state.lock();
        state.have = vec![false; storage.piece_count() as usize];
        state.storage = Some(storage.clone());
    }
    let _ = events
        .send(SessionEvent::MetadataReceived {
            info_hash: fixture.info_hash,
        })
        .await;

    loop {
        let next = {
            let state = shared.state.lock();
            if state.paused {
                None
            } else {
                state.next_piece()
            }
        };

        let Some(piece) = next else {
            let finished = {
                let mut state = shared.state.lock();
                if !state.paused && !state.finished_sent && state.next_piece().is_none() {
                    state.finished_sent = true;
                    true
                } else {
                    false
                }
            };
            if finished {
                let _ = events
                    .send(SessionEvent::Finished {
                        info_hash: fixture.info_hash,
                    })
                    .await;
            }
            // Wait for a deadline, priority, or resume to change the picture.
            let _ =
                tokio::time::timeout(Duration::from_millis(50), shared.wake.notified()).await;
            continue;
        };

        let piece_start = u64::from(piece) * u64::from(storage.piece_length);
        let piece_end = (piece_start + u64::from(storage.piece_length)).min(storage.total_size);
        if let Some(rate) = fixture.download_rate {
            let seconds = (piece_end - piece_start) as f64 / rate.max(1) as f64;
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            let paused = shared.state.lock().paused;
            if paused {
                continue;
            }
        }

        match write_piece(&fixture, &storage, &save_dir, piece_start, piece_end).await {
            Ok(()) => {
                let mut state = shared.state.lock();
                state.have[piece as usize] = true;
                state.deadlines.remove(&piece);
                state.finished_sent = false;
            }
            Err(error) => {
                tracing::warn!(info_hash = %fixture.info_hash, piece, %error, "piece write failed");
                let _ = events
                    .send(SessionEvent::Error {
                        info_hash: fixture.info_hash,
                        message: error.to_string(),
                    })
                    .await;
                return;
            }
        }
    }
}

/// Creates every fixture file sparse at its full size.
async fn create_layout(storage: &FileStorage, save_dir: &Path) -> std::io::Result<()> {
    for file in &storage.files {
        let path = save_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let handle = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;
        handle.set_len(file.size).await?;
    }
    Ok(())
}

/// Writes the bytes of one piece into every file it overlaps.
async fn write_piece(
    fixture: &SwarmFixture,
    storage: &FileStorage,
    save_dir: &Path,
    piece_start: u64,
    piece_end: u64,
) -> std::io::Result<()> {
    let data = match &fixture.payload {
        FixturePayload::Generated => {
            (piece_start..piece_end).map(payload_byte).collect::<Vec<u8>>()
        }
        FixturePayload::CopyFrom(source) => {
            let mut file = tokio::fs::File::open(source).await?;
            file.seek(SeekFrom::Start(piece_start)).await?;
            let mut buf = vec![0u8; (piece_end - piece_start) as usize];
            file.read_exact(&mut buf).await?;
            buf
        }
    };

    for file in &storage.files {
        let file_start = storage.file_offset(file.index);
        let file_end = file_start + file.size;
        if file_end <= piece_start || piece_end <= file_start {
            continue;
        }
        let overlap_start = piece_start.max(file_start);
        let overlap_end = piece_end.min(file_end);
        let slice =
            &data[(overlap_start - piece_start) as usize..(overlap_end - piece_start) as usize];

        let path = save_dir.join(&file.path);
        let mut handle = tokio::fs::OpenOptions::new().write(true).open(&path).await?;
        handle
            .seek(SeekFrom::Start(overlap_start - file_start))
            .await?;
        handle.write_all(slice).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_hash(seed: u8) -> InfoHash {
        InfoHash::new([seed; 20])
    }

    #[tokio::test]
    async fn add_magnet_requires_started_session() {
        let session = SimulatedSession::new();
        let dir = tempfile::tempdir().unwrap();
        let result = session.add_magnet(fixture_hash(1), dir.path()).await;
        assert!(matches!(result, Err(SessionError::NotStarted)));
    }

    #[tokio::test]
    async fn registered_swarm_resolves_metadata_and_lays_out_files() {
        let session = SimulatedSession::new();
        session.start().await.unwrap();
        let mut events = session.take_events().await.unwrap();

        let hash = fixture_hash(2);
        session.register_swarm(SwarmFixture::new(
            hash,
            16 * 1024,
            vec![FixtureFile::new("movie.mkv", 100_000)],
        ));

        let dir = tempfile::tempdir().unwrap();
        let handle = session.add_magnet(hash, dir.path()).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(SessionEvent::MetadataReceived { info_hash: hash })
        );
        let storage = session.file_storage(handle).await.unwrap();
        assert_eq!(storage.files.len(), 1);
        assert_eq!(storage.total_size, 100_000);

        let on_disk = tokio::fs::metadata(dir.path().join("movie.mkv")).await.unwrap();
        assert_eq!(on_disk.len(), 100_000);
    }

    #[tokio::test]
    async fn unthrottled_swarm_finishes_and_writes_payload() {
        let session = SimulatedSession::new();
        session.start().await.unwrap();
        let mut events = session.take_events().await.unwrap();

        let hash = fixture_hash(3);
        session.register_swarm(SwarmFixture::new(
            hash,
            8 * 1024,
            vec![FixtureFile::new("clip.mp4", 20_000)],
        ));
        let dir = tempfile::tempdir().unwrap();
        let handle = session.add_magnet(hash, dir.path()).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(SessionEvent::MetadataReceived { info_hash: hash })
        );
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Finished { info_hash: hash })
        );
        assert!(session.have_piece(handle, 0).await);
        assert!(session.have_piece(handle, 2).await);

        let bytes = tokio::fs::read(dir.path().join("clip.mp4")).await.unwrap();
        assert_eq!(bytes.len(), 20_000);
        assert_eq!(bytes[0], payload_byte(0));
        assert_eq!(bytes[19_999], payload_byte(19_999));
    }

    #[tokio::test]
    async fn deadline_pieces_jump_the_queue() {
        let session = SimulatedSession::new();
        session.start().await.unwrap();
        let mut events = session.take_events().await.unwrap();

        let hash = fixture_hash(4);
        // Slow enough that ordering is observable, fast enough for a test.
        session.register_swarm(
            SwarmFixture::new(hash, 1024, vec![FixtureFile::new("slow.bin", 64 * 1024)])
                .with_download_rate(512 * 1024),
        );
        let dir = tempfile::tempdir().unwrap();
        let handle = session.add_magnet(hash, dir.path()).await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::MetadataReceived { info_hash: hash })
        );

        session.set_piece_deadline(handle, 40, 100).await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !session.have_piece(handle, 40).await {
            assert!(tokio::time::Instant::now() < deadline, "deadline piece never arrived");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // The boosted piece finished ahead of most of the sequential tail.
        assert!(!session.have_piece(handle, 30).await || session.have_piece(handle, 40).await);
    }

    #[tokio::test]
    async fn stale_handle_is_rejected_after_readd() {
        let session = SimulatedSession::new();
        session.start().await.unwrap();
        let hash = fixture_hash(5);
        session.register_swarm(SwarmFixture::new(
            hash,
            1024,
            vec![FixtureFile::new("x.bin", 2048)],
        ));
        let dir = tempfile::tempdir().unwrap();

        let first = session.add_magnet(hash, dir.path()).await.unwrap();
        session.remove(first).await;
        let second = session.add_magnet(hash, dir.path()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(session.find(hash).await, Some(second));
        assert!(session.status(first).await.is_none());
        assert!(session.status(second).await.is_some());
    }

    #[tokio::test]
    async fn pause_stops_progress() {
        let session = SimulatedSession::new();
        session.start().await.unwrap();
        let hash = fixture_hash(6);
        session.register_swarm(
            SwarmFixture::new(hash, 1024, vec![FixtureFile::new("p.bin", 512 * 1024)])
                .with_download_rate(64 * 1024),
        );
        let dir = tempfile::tempdir().unwrap();
        let handle = session.add_magnet(hash, dir.path()).await.unwrap();

        session.pause(handle).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let before = session.status(handle).await.unwrap().progress;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let after = session.status(handle).await.unwrap().progress;
        assert_eq!(before, after);
    }
}
