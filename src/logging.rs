//! File logging for the terminal front-end.
//!
//! The terminal belongs to the UI, so tracing output goes to a daily rolling
//! file under [`log_dir`]. Verbosity follows `RUST_LOG` when it parses and
//! [`DEFAULT_FILTER`] otherwise.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Overrides the log directory.
pub const LOG_DIR_ENV: &str = "PHYSIO_LOCATOR_LOG_DIR";
pub const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "physio-locator.log";

pub fn log_dir() -> PathBuf {
    dir_from(std::env::var(LOG_DIR_ENV).ok())
}

fn dir_from(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Filter for `directives`, falling back to [`DEFAULT_FILTER`] when they are
/// missing or malformed.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn initialize_logging() -> WorkerGuard {
    let dir = log_dir();
    let dir_error = std::fs::create_dir_all(&dir).err();

    let file_appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let installed = tracing_subscriber::registry()
        .with(filter_from(directives.as_deref()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            dir = %dir.display(),
            "Logging initialized"
        );
        if let Some(e) = dir_error {
            tracing::warn!("Could not create log directory {}: {}", dir.display(), e);
        }
    }
    guard
}
