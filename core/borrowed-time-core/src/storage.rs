//! Key-value storage backends and path management.
//!
//! The session lifecycle only ever needs three string keys, so storage is a
//! tiny `get`/`set`/`remove` interface. Two backends ship here:
//!
//! - [`MemoryStore`]: process-local. Clones share one map, which is how tests
//!   model two tabs reading the same origin's storage.
//! - [`FileStore`]: a JSON object file under [`StorageConfig::root`]. Writes
//!   are committed with temp file + rename, so they are durable as soon as
//!   `set` returns and visible to any other process reading the same file.
//!
//! # Defensive Design
//!
//! The file may be touched by another process at any time. We handle:
//! - Missing file (reads as empty)
//! - Empty file (reads as empty)
//! - Corrupt JSON or a non-object root (reads as empty, logs a warning)
//!
//! There is no locking. Concurrent writers race and the last rename wins.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs_err as fs;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{BorrowedTimeError, Result};

/// Durable string storage scoped to one "origin".
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// The three persisted key names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub started_at: String,
    pub expired: String,
    pub ended_at: String,
}

impl StorageKeys {
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            started_at: format!("{namespace}:startedAt"),
            expired: format!("{namespace}:expired"),
            ended_at: format!("{namespace}:endedAt"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_namespace("borrowed-time")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory backend
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| BorrowedTimeError::StorageUnavailable("memory store poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// File backend
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| BorrowedTimeError::io("reading storage file", e))?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Storage file is not a string map; treating as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let parent_dir = self.path.parent().ok_or_else(|| {
            BorrowedTimeError::StorageUnavailable("storage path has no parent directory".into())
        })?;
        fs::create_dir_all(parent_dir)
            .map_err(|e| BorrowedTimeError::io("creating storage directory", e))?;

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| BorrowedTimeError::json("serializing storage", e))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| BorrowedTimeError::io("creating temp storage file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| BorrowedTimeError::io("writing temp storage file", e))?;
        temp_file
            .flush()
            .map_err(|e| BorrowedTimeError::io("flushing temp storage file", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| BorrowedTimeError::io("committing storage file", e.error))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Paths
// ═══════════════════════════════════════════════════════════════════════════════

/// Central configuration for all Borrowed Time storage paths.
///
/// Production code uses `StorageConfig::default()` which points to
/// `~/.borrowed-time/`. Tests use `StorageConfig::with_root(temp_dir)`.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join(".borrowed-time"))
            .unwrap_or_else(|| std::env::temp_dir().join("borrowed-time"));
        Self { root }
    }
}

impl StorageConfig {
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to storage.json (the persisted session keys).
    pub fn storage_file(&self) -> PathBuf {
        self.root.join("storage.json")
    }

    /// Path to config.json (timings and media sources).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Path to logs/ directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Opens the file-backed store for this root.
    pub fn open_store(&self) -> FileStore {
        FileStore::new(self.storage_file())
    }
}
