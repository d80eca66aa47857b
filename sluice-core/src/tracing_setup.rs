//! Log output for Sluice.
//!
//! Two sinks with different audiences: the console gets compact,
//! human-oriented lines at the operator's chosen level, and a JSON log of
//! everything at debug and above goes to disk so a failed streaming session
//! can be inspected with line-oriented tooling after the fact. The previous
//! run's file is kept as `sluice.log.1`, so a crash can be compared against
//! the run before it.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE: &str = "sluice.log";

/// Installs the global subscriber and returns the path of the JSON log.
///
/// Console verbosity comes from `level`, unless `RUST_LOG` is set, in which
/// case the environment wins wholesale. The disk log always captures debug
/// and above, independent of the console setting.
///
/// # Errors
/// - `std::io::Error` - the logs directory or log file could not be created
pub fn init_tracing(level: Level, logs_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(logs_dir)?;
    let log_path = logs_dir.join(LOG_FILE);
    rotate_previous(&log_path)?;
    let log_file = File::create(&log_path)?;

    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(console_filter(level));

    let file = fmt::layer()
        .json()
        .flatten_event(true)
        .with_writer(log_file)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry().with(console).with(file).init();

    tracing::info!(log = %log_path.display(), "logging to console and file");
    Ok(log_path)
}

/// Console filter: `RUST_LOG` wins; otherwise the chosen level, with the
/// HTTP machinery held at warn so per-request noise stays off the terminal.
fn console_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.to_string().to_lowercase();
        EnvFilter::new(format!("{level},hyper=warn,tower=warn,mio=warn"))
    })
}

/// Keeps exactly one previous run, renamed to `sluice.log.1`.
fn rotate_previous(log_path: &Path) -> io::Result<()> {
    let previous = log_path.with_extension("log.1");
    match fs::rename(log_path, &previous) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}
