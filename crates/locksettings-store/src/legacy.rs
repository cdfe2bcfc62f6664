//! One-time import of legacy global lock settings
//!
//! Older releases kept lock settings in the device-wide secure settings. On
//! first boot with the per-user store, the keys in [`LEGACY_SETTINGS`] are
//! copied to user 0 and the [`MIGRATED_KEY`] sentinel is written. Later runs
//! see the sentinel and do nothing.

use crate::models::{SettingValue, SYSTEM_USER};
use crate::settings_table::SettingsTable;
use crate::{Database, Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Sentinel key marking the import as done
pub const MIGRATED_KEY: &str = "migrated";

/// Version of the legacy key list below
pub const LEGACY_SETTINGS_VERSION: u32 = 1;

/// Legacy global settings imported into user 0
pub static LEGACY_SETTINGS: &[&str] = &[
    "lockscreen.lockedoutpermanently",
    "lockscreen.lockoutattemptdeadline",
    "lockscreen.patterneverchosen",
    "lockscreen.password_type",
    "lockscreen.password_type_alternate",
    "lockscreen.password_salt",
    "lockscreen.disabled",
    "lockscreen.options",
    "lockscreen.biometric_weak_fallback",
    "lockscreen.biometricweakeverchosen",
    "lockscreen.power_button_instantly_locks",
    "lockscreen.passwordhistory",
    "lock_pattern_autolock",
    "lock_biometric_weak_flags",
    "lock_pattern_visible_pattern",
    "lock_pattern_tactile_feedback_enabled",
    "lock_sync_encryption_password",
    "lock_pattern_show_error_path",
    "lock_pattern_dots_visible",
];

/// Source of legacy global settings
pub trait LegacySettingsSource: Send + Sync {
    /// Value of `key`, or `None` when never set
    fn get_string(&self, key: &str) -> Result<Option<String>>;
}

/// Legacy settings held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryLegacySettings {
    values: HashMap<String, String>,
}

impl InMemoryLegacySettings {
    /// Create empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a legacy value
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl LegacySettingsSource for InMemoryLegacySettings {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Legacy settings exported as a flat JSON object
///
/// Strings are taken verbatim, booleans become "1"/"0", numbers their
/// decimal form and `null` means unset.
#[derive(Debug, Clone)]
pub struct JsonLegacySettings {
    values: serde_json::Map<String, serde_json::Value>,
}

impl JsonLegacySettings {
    /// Parse the export at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        match serde_json::from_slice::<serde_json::Value>(&raw)? {
            serde_json::Value::Object(values) => Ok(Self { values }),
            _ => Err(Error::Migration(format!(
                "{} is not a JSON object",
                path.display()
            ))),
        }
    }
}

impl LegacySettingsSource for JsonLegacySettings {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        use serde_json::Value;
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Bool(b)) => Ok(Some(SettingValue::Bool(*b).to_stored())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(Error::Migration(format!(
                "legacy setting {} has unsupported value {}",
                key, other
            ))),
        }
    }
}

/// Result of a migration attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Sentinel already present, nothing done
    AlreadyMigrated,
    /// Legacy values copied and sentinel written
    Migrated {
        /// Number of legacy keys that had a value
        copied: usize,
    },
    /// Migration could not run; the store keeps working without it
    Failed,
}

/// Imports legacy settings into the settings table
pub struct MigrationManager<'a> {
    db: &'a Database,
}

impl<'a> MigrationManager<'a> {
    /// Create manager over `db`
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Import legacy settings unless already done; never fails
    pub fn migrate_if_needed(&self, source: &dyn LegacySettingsSource) -> MigrationOutcome {
        match self.try_migrate(source) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Unable to migrate old lock settings: {}", e);
                MigrationOutcome::Failed
            }
        }
    }

    fn try_migrate(&self, source: &dyn LegacySettingsSource) -> Result<MigrationOutcome> {
        let table = SettingsTable::new(self.db);
        if table.read(MIGRATED_KEY, SYSTEM_USER)?.is_some() {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let mut found = Vec::new();
        for key in LEGACY_SETTINGS {
            if let Some(value) = source.get_string(key)? {
                found.push((*key, value));
            }
        }

        self.db.write(|tx| {
            for (key, value) in &found {
                SettingsTable::write_tx(tx, key, value, SYSTEM_USER)?;
            }
            SettingsTable::write_tx(tx, MIGRATED_KEY, "true", SYSTEM_USER)
        })?;

        tracing::info!(
            copied = found.len(),
            version = LEGACY_SETTINGS_VERSION,
            "Migrated lock settings to new location"
        );
        Ok(MigrationOutcome::Migrated {
            copied: found.len(),
        })
    }
}
