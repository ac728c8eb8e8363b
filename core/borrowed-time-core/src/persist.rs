//! Session timestamps persisted in key-value storage.
//!
//! `PersistentClock` is pure data access: it reads and writes the start time,
//! the sticky expiry flag, and the end time. It makes no decisions about what
//! those values mean; that belongs to [`SessionMachine`](crate::SessionMachine).
//!
//! # Encoding
//!
//! | Key         | Value                                   |
//! |-------------|-----------------------------------------|
//! | `startedAt` | epoch milliseconds, decimal string      |
//! | `expired`   | `"true"`, or absent                     |
//! | `endedAt`   | epoch milliseconds, decimal string      |
//!
//! A start time that is missing, zero, or not a number reads as "no session
//! started". Any `expired` value other than `"true"` reads as not expired.
//!
//! # Degradation
//!
//! Storage failures never reach the caller. The first failure swaps the
//! backend for an in-memory store seeded with the last values this clock saw,
//! and the session carries on for the life of the process without persistence.

use tracing::warn;

use crate::error::BorrowedTimeError;
use crate::storage::{KeyValueStore, MemoryStore, StorageKeys};

const EXPIRED_TRUE: &str = "true";

/// Snapshot of the three persisted values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub started_at: Option<i64>,
    pub expired: bool,
    pub ended_at: Option<i64>,
}

pub struct PersistentClock {
    store: Box<dyn KeyValueStore>,
    keys: StorageKeys,
    last_known: PersistedSession,
    degraded: bool,
}

impl PersistentClock {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_keys(store, StorageKeys::default())
    }

    pub fn with_keys(store: Box<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self {
            store,
            keys,
            last_known: PersistedSession::default(),
            degraded: false,
        }
    }

    /// False once storage has failed and the clock fell back to memory.
    pub fn is_persistent(&self) -> bool {
        !self.degraded
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn load(&mut self) -> PersistedSession {
        match self.try_load() {
            Ok(session) => {
                self.last_known = session;
                session
            }
            Err(err) => {
                self.degrade(&err);
                self.last_known
            }
        }
    }

    pub fn write_start(&mut self, started_at: i64) {
        self.last_known.started_at = Some(started_at);
        let key = self.keys.started_at.clone();
        self.write(&key, &started_at.to_string());
    }

    pub fn mark_expired(&mut self, ended_at: i64) {
        self.last_known.expired = true;
        self.last_known.ended_at = Some(ended_at);
        let expired_key = self.keys.expired.clone();
        let ended_key = self.keys.ended_at.clone();
        self.write(&expired_key, EXPIRED_TRUE);
        self.write(&ended_key, &ended_at.to_string());
    }

    /// Removes all three keys.
    pub fn clear(&mut self) {
        self.last_known = PersistedSession::default();
        let keys = self.keys.clone();
        for key in [&keys.expired, &keys.ended_at, &keys.started_at] {
            if let Err(err) = self.store.remove(key) {
                self.degrade(&err);
            }
        }
    }

    fn try_load(&self) -> Result<PersistedSession, BorrowedTimeError> {
        let expired = self.store.get(&self.keys.expired)?.as_deref() == Some(EXPIRED_TRUE);
        let started_at = self
            .store
            .get(&self.keys.started_at)?
            .as_deref()
            .and_then(parse_timestamp);
        let ended_at = self
            .store
            .get(&self.keys.ended_at)?
            .as_deref()
            .and_then(parse_timestamp);

        Ok(PersistedSession {
            started_at,
            expired,
            ended_at,
        })
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            self.degrade(&err);
        }
    }

    /// Swaps in an in-memory store holding `last_known`. Idempotent.
    fn degrade(&mut self, err: &BorrowedTimeError) {
        if self.degraded {
            warn!(error = %err, "In-memory session store failed");
            return;
        }
        warn!(
            error = %err,
            "Session storage unavailable; continuing without persistence"
        );

        let mut fallback = MemoryStore::new();
        let seed = self.last_known;
        let mut seed_entries: Vec<(&str, String)> = Vec::new();
        if let Some(started_at) = seed.started_at {
            seed_entries.push((self.keys.started_at.as_str(), started_at.to_string()));
        }
        if seed.expired {
            seed_entries.push((self.keys.expired.as_str(), EXPIRED_TRUE.to_string()));
        }
        if let Some(ended_at) = seed.ended_at {
            seed_entries.push((self.keys.ended_at.as_str(), ended_at.to_string()));
        }
        for (key, value) in seed_entries {
            // A fresh MemoryStore has no lock to poison.
            let _ = fallback.set(key, &value);
        }

        self.store = Box::new(fallback);
        self.degraded = true;
    }
}

/// Numeric coercion for stored timestamps. Zero, blank, and non-numeric
/// values all mean "absent".
fn parse_timestamp(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return (value != 0).then_some(value);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value != 0.0)
        .map(|value| value.trunc() as i64)
}
