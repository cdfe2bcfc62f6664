//! Per-user lock credential storage
//!
//! Keeps lock screen settings in a SQLite table keyed by `(user, name)` and
//! the raw credential hashes in per-user files next to it.
//!
//! ## Layout
//!
//! - **Settings**: `<data_dir>/system/locksettings.db`, WAL mode, one row per key and user
//! - **Hashes**: `gesture.key` (or `cm_gesture.key` for non-default pattern sizes) and `password.key`
//! - **Gesture templates**: `lock_gesture.key`, matched by a pluggable [`GestureRecognizer`]
//! - **Users**: user 0 lives in `system/`, every other user in `system/users/<id>/`
//!
//! ## Access
//!
//! Every [`LockSettingsService`] call names its caller. Writes and secret
//! checks are reserved to the system identity; plain reads are also open to
//! the user the data belongs to.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod config;
pub mod database;
pub mod error;
pub mod gesture_vault;
pub mod hash_vault;
pub mod legacy;
pub mod locks;
pub mod migrations;
pub mod models;
pub mod paths;
pub mod recognizer;
pub mod service;
pub mod settings_table;

pub use access::{AccessClass, AccessGate, Operation};
pub use config::{StoreConfig, UnreadableSecretPolicy, DATA_DIR_ENV, DEFAULT_MIN_GESTURE_PREDICTION_SCORE};
pub use database::Database;
pub use error::{Error, Result};
pub use gesture_vault::{GestureLibrary, GestureVault, LOCK_GESTURE_NAME};
pub use hash_vault::HashVault;
pub use legacy::{
    InMemoryLegacySettings, JsonLegacySettings, LegacySettingsSource, MigrationManager,
    MigrationOutcome, LEGACY_SETTINGS, LEGACY_SETTINGS_VERSION, MIGRATED_KEY,
};
pub use locks::{CredentialLocks, LockSlot};
pub use models::*;
pub use paths::UserPaths;
pub use recognizer::{GestureRecognizer, MockRecognizer, MOCK_EXACT_SCORE};
pub use service::{
    LockSettingsService, DISABLE_LOCKSCREEN_KEY, LOCK_PATTERN_SIZE_KEY, PATTERN_SIZE_DEFAULT,
    PATTERN_SIZE_LIMIT,
};
pub use settings_table::SettingsTable;
