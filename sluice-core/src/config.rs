//! Centralized configuration for Sluice.
//!
//! Every tunable — ports, directories, polling cadences, deadline schedules —
//! lives here instead of being scattered through the codebase as magic
//! numbers. Supports environment variable overrides for runtime
//! customization.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Sluice components.
#[derive(Debug, Clone, Default)]
pub struct SluiceConfig {
    /// Control API settings.
    pub api: ApiConfig,
    /// Engine lifecycle settings.
    pub engine: EngineConfig,
    /// Streaming reader settings.
    pub streaming: StreamingConfig,
}

/// Control API bind settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind; loopback only by design.
    pub host: IpAddr,
    /// TCP port for the control API.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8888,
        }
    }
}

/// Torrent engine lifecycle and prioritization settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for per-torrent save directories.
    pub downloads_root: PathBuf,
    /// Torrents idle longer than this are evicted.
    pub idle_max_age: Duration,
    /// How often the idle sweeper runs.
    pub sweep_interval: Duration,
    /// How long the proxy path waits for metadata before giving up.
    pub metadata_wait_timeout: Duration,
    /// Poll interval while waiting for metadata.
    pub metadata_poll_interval: Duration,
    /// How many leading pieces get a deadline boost after selection.
    pub deadline_boost_window: u32,
    /// Deadline for the first boosted piece, in milliseconds.
    pub deadline_boost_base_ms: u32,
    /// Deadline increment per subsequent boosted piece, in milliseconds.
    pub deadline_boost_step_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            downloads_root: PathBuf::from("downloads"),
            idle_max_age: Duration::from_secs(72 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            metadata_wait_timeout: Duration::from_secs(60),
            metadata_poll_interval: Duration::from_millis(200),
            deadline_boost_window: 40,
            deadline_boost_base_ms: 300,
            deadline_boost_step_ms: 120,
        }
    }
}

/// Piece-aware reader settings.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// How long a read waits for one piece before failing.
    pub piece_wait_timeout: Duration,
    /// Poll interval while waiting for a piece.
    pub piece_poll_interval: Duration,
    /// Reannounce cadence while a read is stalled.
    pub reannounce_interval: Duration,
    /// How many pieces past the cursor get deadline pre-warming.
    pub ensure_ahead_pieces: u32,
    /// Deadline for the cursor piece during a wait, in milliseconds.
    pub ensure_deadline_base_ms: u32,
    /// Deadline increment per look-ahead piece, in milliseconds.
    pub ensure_deadline_step_ms: u32,
    /// Read chunk size in bytes.
    pub chunk_size: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            piece_wait_timeout: Duration::from_secs(60),
            piece_poll_interval: Duration::from_millis(500),
            reannounce_interval: Duration::from_secs(5),
            ensure_ahead_pieces: 12,
            ensure_deadline_base_ms: 1000,
            ensure_deadline_step_ms: 250,
            chunk_size: 64 * 1024,
        }
    }
}

impl SluiceConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("SLUICE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.api.port = port;
            }
        }

        if let Ok(dir) = std::env::var("SLUICE_DOWNLOADS_DIR") {
            if !dir.is_empty() {
                config.engine.downloads_root = PathBuf::from(dir);
            }
        }

        if let Ok(hours) = std::env::var("SLUICE_IDLE_MAX_AGE_HOURS") {
            if let Ok(hours) = hours.parse::<u64>() {
                config.engine.idle_max_age = Duration::from_secs(hours * 60 * 60);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_streaming_contract() {
        let config = SluiceConfig::default();
        assert_eq!(config.api.port, 8888);
        assert_eq!(config.engine.idle_max_age, Duration::from_secs(259_200));
        assert_eq!(config.engine.deadline_boost_window, 40);
        assert_eq!(config.streaming.piece_wait_timeout, Duration::from_secs(60));
        assert_eq!(
            config.streaming.piece_poll_interval,
            Duration::from_millis(500)
        );
        assert_eq!(config.streaming.ensure_ahead_pieces, 12);
        assert_eq!(config.streaming.chunk_size, 65_536);
    }

    #[test]
    fn env_overrides_apply() {
        unsafe {
            std::env::set_var("SLUICE_PORT", "9091");
            std::env::set_var("SLUICE_DOWNLOADS_DIR", "/tmp/sluice-dl");
            std::env::set_var("SLUICE_IDLE_MAX_AGE_HOURS", "12");
        }

        let config = SluiceConfig::from_env();
        assert_eq!(config.api.port, 9091);
        assert_eq!(config.engine.downloads_root, PathBuf::from("/tmp/sluice-dl"));
        assert_eq!(config.engine.idle_max_age, Duration::from_secs(12 * 3600));

        unsafe {
            std::env::remove_var("SLUICE_PORT");
            std::env::remove_var("SLUICE_DOWNLOADS_DIR");
            std::env::remove_var("SLUICE_IDLE_MAX_AGE_HOURS");
        }
    }
}
