//! File logging for the terminal host.
//!
//! The scene is drawn on stdout, so logs go to a daily rolling file under
//! `~/.borrowed-time/logs/` instead. `RUST_LOG` controls the filter;
//! `BORROWED_TIME_DEBUG_LOG=1` forces `debug`.

use std::env;

use borrowed_time_core::StorageConfig;
use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "borrowed-time.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered lines are lost on exit.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let debug_enabled = env::var("BORROWED_TIME_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let logs_dir = storage.logs_dir();
    if let Err(err) = fs::create_dir_all(&logs_dir) {
        // No log directory means no logs; the experience itself still runs.
        eprintln!("Warning: could not create log directory: {err}");
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
