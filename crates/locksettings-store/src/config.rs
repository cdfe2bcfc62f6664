//! Store configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below.

use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default data directory
pub const DATA_DIR_ENV: &str = "LOCKSETTINGS_DATA_DIR";

/// Default minimum recognizer score for a gesture to unlock
pub const DEFAULT_MIN_GESTURE_PREDICTION_SCORE: f64 = 2.0;

/// What to do when a stored hash exists but cannot be read
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnreadableSecretPolicy {
    /// Fail the check with `Error::SecretUnavailable`
    #[default]
    #[serde(rename = "reject")]
    Reject,
    /// Log and report the candidate as matching
    #[serde(rename = "assume_match")]
    AssumeMatch,
}

/// Lock settings store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root of the device data partition; `system/` lives below it
    pub data_dir: PathBuf,
    /// Minimum recognizer score (exclusive) for a gesture match
    pub min_gesture_prediction_score: f64,
    /// Seed `lockscreen.disabled = 1` for user 0 when the database is created
    pub lockscreen_disabled_by_default: bool,
    /// Behavior for unreadable hash files during a check
    pub unreadable_secret_policy: UnreadableSecretPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            min_gesture_prediction_score: DEFAULT_MIN_GESTURE_PREDICTION_SCORE,
            lockscreen_disabled_by_default: false,
            unreadable_secret_policy: UnreadableSecretPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with default settings otherwise
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!("Loaded store config from {}", path.display());
        Ok(config)
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("data_dir must not be empty".to_string()));
        }
        if !self.min_gesture_prediction_score.is_finite() {
            return Err(Error::Config(
                "min_gesture_prediction_score must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "LockSettings", "locksettings")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}
