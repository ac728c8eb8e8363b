//! Experience timings and media sources.
//!
//! Loaded from `~/.borrowed-time/config.json`. Every field is optional in the
//! file; anything missing takes its default.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BorrowedTimeError, Result};
use crate::storage::StorageConfig;

pub const DEFAULT_DURATION_MS: u64 = 60_000;
pub const DEFAULT_FADE_DELAY_MS: u64 = 1_800;
pub const DEFAULT_INTRO_VISIBLE_MS: u64 = 2_600;
pub const DEFAULT_NOTE_LIFETIME_MS: u64 = 5_000;
pub const DEFAULT_REDUCED_MOTION_NOTE_LIFETIME_MS: u64 = 2_000;
pub const DEFAULT_NOTE_REMOVAL_GRACE_MS: u64 = 100;
pub const DEFAULT_MAX_LIVE_NOTES: usize = 12;
pub const DEFAULT_SECOND_CHANCE_DELAY_MS: u64 = 1_200;
pub const DEFAULT_SECOND_CHANCE_DISMISS_MS: u64 = 900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceConfig {
    pub duration_ms: u64,
    /// End-transition fade. Skipped entirely under reduced motion.
    pub fade_delay_ms: u64,
    pub intro_visible_ms: u64,
    pub note_lifetime_ms: u64,
    pub reduced_motion_note_lifetime_ms: u64,
    pub note_removal_grace_ms: u64,
    pub max_live_notes: usize,
    pub second_chance_delay_ms: u64,
    pub second_chance_dismiss_ms: u64,
    pub serene_src: String,
    pub ruins_src: String,
    /// Prefix for the persisted storage keys.
    pub storage_namespace: String,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            fade_delay_ms: DEFAULT_FADE_DELAY_MS,
            intro_visible_ms: DEFAULT_INTRO_VISIBLE_MS,
            note_lifetime_ms: DEFAULT_NOTE_LIFETIME_MS,
            reduced_motion_note_lifetime_ms: DEFAULT_REDUCED_MOTION_NOTE_LIFETIME_MS,
            note_removal_grace_ms: DEFAULT_NOTE_REMOVAL_GRACE_MS,
            max_live_notes: DEFAULT_MAX_LIVE_NOTES,
            second_chance_delay_ms: DEFAULT_SECOND_CHANCE_DELAY_MS,
            second_chance_dismiss_ms: DEFAULT_SECOND_CHANCE_DISMISS_MS,
            serene_src: "media/serene.mp4".to_string(),
            ruins_src: "media/ruins.mp4".to_string(),
            storage_namespace: "borrowed-time".to_string(),
        }
    }
}

impl ExperienceConfig {
    pub fn fade_delay(&self, reduced_motion: bool) -> u64 {
        if reduced_motion {
            0
        } else {
            self.fade_delay_ms
        }
    }

    pub fn note_lifetime(&self, reduced_motion: bool) -> u64 {
        if reduced_motion {
            self.reduced_motion_note_lifetime_ms
        } else {
            self.note_lifetime_ms
        }
    }
}

/// Loads the experience configuration, returning defaults if the file doesn't
/// exist or can't be parsed.
pub fn load_config(storage: &StorageConfig) -> ExperienceConfig {
    let path = storage.config_file();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ExperienceConfig::default()
        }
        Err(err) => {
            warn!(error = %err, "Failed to read config; using defaults");
            return ExperienceConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Malformed config; using defaults");
            ExperienceConfig::default()
        }
    }
}

/// Saves the experience configuration to disk.
pub fn save_config(storage: &StorageConfig, config: &ExperienceConfig) -> Result<()> {
    let path = storage.config_file();
    fs::create_dir_all(storage.root())
        .map_err(|e| BorrowedTimeError::io("creating config directory", e))?;
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| BorrowedTimeError::json("serializing config", e))?;
    fs::write(&path, content)
        .map_err(|source| BorrowedTimeError::ConfigWriteFailed { path, source })
}
