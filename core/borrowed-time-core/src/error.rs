//! Error types for borrowed-time-core operations.
//!
//! Only the storage and config plumbing can fail. The session, note, and scene
//! layers absorb these errors and degrade instead of propagating them.

use std::path::PathBuf;

/// All errors that can occur in borrowed-time-core plumbing.
#[derive(Debug, thiserror::Error)]
pub enum BorrowedTimeError {
    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BorrowedTimeError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BorrowedTimeError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        BorrowedTimeError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using BorrowedTimeError.
pub type Result<T> = std::result::Result<T, BorrowedTimeError>;

impl From<BorrowedTimeError> for String {
    fn from(err: BorrowedTimeError) -> String {
        err.to_string()
    }
}
