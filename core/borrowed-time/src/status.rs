//! Inspect or clear the persisted session without starting one.

use std::io::{self, Write};

use borrowed_time_core::{
    format_seconds, load_config, ExperienceConfig, PersistedSession, PersistentClock,
    StorageConfig, StorageKeys,
};
use chrono::{DateTime, Utc};
use tracing::info;

fn open_clock(storage: &StorageConfig, config: &ExperienceConfig) -> PersistentClock {
    PersistentClock::with_keys(
        Box::new(storage.open_store()),
        StorageKeys::with_namespace(&config.storage_namespace),
    )
}

pub fn show(storage: &StorageConfig, out: &mut impl Write) -> io::Result<()> {
    let config = load_config(storage);
    let mut clock = open_clock(storage, &config);
    let session = clock.load();

    writeln!(out, "storage: {}", storage.storage_file().display())?;
    if !clock.is_persistent() {
        writeln!(out, "storage unreadable; showing defaults")?;
    }
    writeln!(
        out,
        "{}",
        describe(&session, config.duration_ms, Utc::now().timestamp_millis())
    )
}

pub fn reset(storage: &StorageConfig, out: &mut impl Write) -> io::Result<()> {
    let config = load_config(storage);
    let mut clock = open_clock(storage, &config);
    clock.clear();
    info!(namespace = %config.storage_namespace, "Persisted session cleared");
    writeln!(out, "Session cleared. The next run starts a full minute.")
}

/// One-paragraph summary of a persisted session as of `now_ms`.
pub fn describe(session: &PersistedSession, duration_ms: u64, now_ms: i64) -> String {
    if session.expired {
        let ended = session
            .ended_at
            .map(timestamp)
            .unwrap_or_else(|| "unknown".to_string());
        return format!("expired (ended {ended})");
    }
    let Some(started_at) = session.started_at else {
        return "no session yet".to_string();
    };

    let elapsed = now_ms.saturating_sub(started_at).max(0) as u64;
    if elapsed >= duration_ms {
        format!(
            "started {}; time is up (expires on next run)",
            timestamp(started_at)
        )
    } else {
        format!(
            "active since {}; {} left",
            timestamp(started_at),
            format_seconds(duration_ms - elapsed)
        )
    }
}

fn timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
