//! Subscriber setup for the CLI. Library crates only emit events.
//!
//! - `RUST_LOG` sets the filter (default `info`); `FLEET_DEBUG_LOG=1` forces `debug`
//! - Events go to stderr so stdout stays machine-readable JSON
//! - `FLEET_LOG_FILE=1` also writes a daily-rolling file under the storage `logs/` dir

use std::env;
use std::path::Path;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "fleet-check.log";

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let filter = if env_flag("FLEET_DEBUG_LOG") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match file_writer(logs_dir) {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    // A subscriber may already be installed (tests); keep the existing one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn file_writer(
    logs_dir: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !env_flag("FLEET_LOG_FILE") {
        return None;
    }
    if let Err(e) = fs::create_dir_all(logs_dir) {
        eprintln!("fleet-check: file logging disabled: {e}");
        return None;
    }
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
