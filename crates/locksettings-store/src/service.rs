//! Lock settings service
//!
//! Public surface of the store. Every call carries a [`CallerContext`] that
//! is checked by the [`AccessGate`] before anything is read or written, then
//! dispatched to the settings table or one of the credential vaults.

use crate::access::{AccessGate, Operation};
use crate::config::StoreConfig;
use crate::gesture_vault::GestureVault;
use crate::hash_vault::HashVault;
use crate::legacy::{LegacySettingsSource, MigrationManager, MigrationOutcome};
use crate::locks::{CredentialLocks, LockSlot};
use crate::models::{CallerContext, CredentialKind, Gesture, SettingValue, SizeVariant, UserId, SYSTEM_USER};
use crate::paths::UserPaths;
use crate::recognizer::GestureRecognizer;
use crate::settings_table::SettingsTable;
use crate::{Database, Result};
use std::sync::Arc;

/// Setting holding the pattern grid size of a user
pub const LOCK_PATTERN_SIZE_KEY: &str = "lock_pattern_size";

/// Setting disabling the lock screen
pub const DISABLE_LOCKSCREEN_KEY: &str = "lockscreen.disabled";

/// Pattern grid size stored under the default file name
pub const PATTERN_SIZE_DEFAULT: u8 = 3;

/// Exclusive upper bound of a valid pattern size
pub const PATTERN_SIZE_LIMIT: i64 = 128;

/// Per-user lock credential and settings store
pub struct LockSettingsService {
    db: Database,
    paths: UserPaths,
    gate: AccessGate,
    hashes: HashVault,
    gestures: GestureVault,
    locks: CredentialLocks,
    recognizer: Arc<dyn GestureRecognizer>,
}

impl LockSettingsService {
    /// Open the store described by `config`
    pub fn open(config: &StoreConfig, recognizer: Arc<dyn GestureRecognizer>) -> Result<Self> {
        config.validate()?;
        let paths = UserPaths::new(&config.data_dir);
        let db = Database::open(paths.database_path())?;

        if db.was_created() && config.lockscreen_disabled_by_default {
            SettingsTable::new(&db).set_string(DISABLE_LOCKSCREEN_KEY, "1", SYSTEM_USER)?;
            tracing::info!("Lock screen disabled by default");
        }

        tracing::info!("Lock settings store opened at {}", paths.system_dir().display());
        Ok(Self {
            hashes: HashVault::new(paths.clone(), config.unreadable_secret_policy),
            gestures: GestureVault::new(paths.clone(), config.min_gesture_prediction_score),
            db,
            paths,
            gate: AccessGate,
            locks: CredentialLocks::new(),
            recognizer,
        })
    }

    /// File layout used by this store
    pub fn paths(&self) -> &UserPaths {
        &self.paths
    }

    /// Import legacy global settings once the system is up
    pub fn system_ready(
        &self,
        ctx: &CallerContext,
        legacy: &dyn LegacySettingsSource,
    ) -> Result<MigrationOutcome> {
        self.gate.check(ctx, Operation::SystemReady, SYSTEM_USER)?;
        Ok(MigrationManager::new(&self.db).migrate_if_needed(legacy))
    }

    fn settings(&self) -> SettingsTable<'_> {
        SettingsTable::new(&self.db)
    }

    /// Write a setting; a pattern size change moves the stored pattern hash
    /// to the file of the new size so no stale hash is left behind
    fn write_setting(&self, key: &str, value: &SettingValue, user_id: UserId) -> Result<()> {
        if key != LOCK_PATTERN_SIZE_KEY {
            return self.settings().write(key, value, user_id);
        }

        let slot = LockSlot::Credential(CredentialKind::Pattern);
        self.locks.with_lock(user_id, slot, || {
            let before = self.size_variant(user_id);
            self.settings().write(key, value, user_id)?;
            let after = self.size_variant(user_id);
            self.hashes.move_pattern(user_id, before, after)
        })
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Write a boolean setting
    pub fn set_boolean(&self, ctx: &CallerContext, key: &str, value: bool, user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetBoolean, user_id)?;
        self.write_setting(key, &SettingValue::Bool(value), user_id)
    }

    /// Write an integer setting
    pub fn set_long(&self, ctx: &CallerContext, key: &str, value: i64, user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetLong, user_id)?;
        self.write_setting(key, &SettingValue::Long(value), user_id)
    }

    /// Write a string setting
    pub fn set_string(&self, ctx: &CallerContext, key: &str, value: &str, user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetString, user_id)?;
        self.write_setting(key, &SettingValue::Str(value.to_string()), user_id)
    }

    /// Read a boolean setting
    pub fn get_boolean(&self, ctx: &CallerContext, key: &str, default: bool, user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::GetBoolean, user_id)?;
        self.settings().get_bool(key, default, user_id)
    }

    /// Read an integer setting
    pub fn get_long(&self, ctx: &CallerContext, key: &str, default: i64, user_id: UserId) -> Result<i64> {
        self.gate.check(ctx, Operation::GetLong, user_id)?;
        self.settings().get_long(key, default, user_id)
    }

    /// Read a string setting
    pub fn get_string(
        &self,
        ctx: &CallerContext,
        key: &str,
        default: Option<&str>,
        user_id: UserId,
    ) -> Result<Option<String>> {
        self.gate.check(ctx, Operation::GetString, user_id)?;
        self.settings().get_string(key, default, user_id)
    }

    /// Configured pattern grid size, or the default when unset or invalid
    pub fn get_lock_pattern_size(&self, ctx: &CallerContext, user_id: UserId) -> Result<u8> {
        self.gate.check(ctx, Operation::GetLockPatternSize, user_id)?;
        Ok(self.pattern_size(user_id))
    }

    fn pattern_size(&self, user_id: UserId) -> u8 {
        match self.settings().get_long(LOCK_PATTERN_SIZE_KEY, -1, user_id) {
            Ok(size) if size > 0 && size < PATTERN_SIZE_LIMIT => size as u8,
            Ok(_) => PATTERN_SIZE_DEFAULT,
            Err(e) => {
                tracing::warn!(user_id, "Cannot read pattern size, using default: {}", e);
                PATTERN_SIZE_DEFAULT
            }
        }
    }

    fn size_variant(&self, user_id: UserId) -> SizeVariant {
        if self.pattern_size(user_id) == PATTERN_SIZE_DEFAULT {
            SizeVariant::Default
        } else {
            SizeVariant::Alternate
        }
    }

    // ------------------------------------------------------------------
    // Pattern and password hashes
    // ------------------------------------------------------------------

    fn set_hash(&self, kind: CredentialKind, hash: &[u8], user_id: UserId) -> Result<()> {
        self.locks
            .with_lock(user_id, LockSlot::Credential(kind), || {
                let variant = self.size_variant(user_id);
                self.hashes.set_hash(kind, hash, user_id, variant)
            })
    }

    fn check_hash(&self, kind: CredentialKind, hash: &[u8], user_id: UserId) -> Result<bool> {
        self.locks
            .with_lock(user_id, LockSlot::Credential(kind), || {
                let variant = self.size_variant(user_id);
                self.hashes.check_hash(kind, hash, user_id, variant)
            })
    }

    fn have_hash(&self, kind: CredentialKind, user_id: UserId) -> bool {
        let variant = self.size_variant(user_id);
        self.hashes.have_credential(kind, user_id, variant)
    }

    /// Store a pattern hash; an empty hash clears the pattern
    pub fn set_lock_pattern(&self, ctx: &CallerContext, hash: &[u8], user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetLockPattern, user_id)?;
        self.set_hash(CredentialKind::Pattern, hash, user_id)
    }

    /// Compare a pattern hash with the stored one
    pub fn check_pattern(&self, ctx: &CallerContext, hash: &[u8], user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::CheckPattern, user_id)?;
        self.check_hash(CredentialKind::Pattern, hash, user_id)
    }

    /// Store a password hash; an empty hash clears the password
    pub fn set_lock_password(&self, ctx: &CallerContext, hash: &[u8], user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetLockPassword, user_id)?;
        self.set_hash(CredentialKind::Password, hash, user_id)
    }

    /// Compare a password hash with the stored one
    pub fn check_password(&self, ctx: &CallerContext, hash: &[u8], user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::CheckPassword, user_id)?;
        self.check_hash(CredentialKind::Password, hash, user_id)
    }

    /// Whether a password is configured
    pub fn have_password(&self, ctx: &CallerContext, user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::HavePassword, user_id)?;
        Ok(self.have_hash(CredentialKind::Password, user_id))
    }

    /// Whether a pattern is configured for the current pattern size
    pub fn have_pattern(&self, ctx: &CallerContext, user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::HavePattern, user_id)?;
        Ok(self.have_hash(CredentialKind::Pattern, user_id))
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Replace the lock gesture
    pub fn set_lock_gesture(&self, ctx: &CallerContext, gesture: &Gesture, user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::SetLockGesture, user_id)?;
        self.locks.with_lock(user_id, LockSlot::Gesture, || {
            self.gestures.set_gesture(gesture, user_id)
        })
    }

    /// Whether `gesture` matches the stored lock gesture
    pub fn check_gesture(&self, ctx: &CallerContext, gesture: &Gesture, user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::CheckGesture, user_id)?;
        self.locks.with_lock(user_id, LockSlot::Gesture, || {
            self.gestures
                .check_gesture(gesture, user_id, self.recognizer.as_ref())
        })
    }

    /// Whether a lock gesture is stored
    pub fn have_gesture(&self, ctx: &CallerContext, user_id: UserId) -> Result<bool> {
        self.gate.check(ctx, Operation::HaveGesture, user_id)?;
        Ok(self.gestures.have_gesture(user_id))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Remove every credential file and setting of `user_id`
    ///
    /// File removal is best-effort; the settings rows are deleted in one
    /// transaction that either fully applies or leaves the table untouched.
    pub fn remove_user(&self, ctx: &CallerContext, user_id: UserId) -> Result<()> {
        self.gate.check(ctx, Operation::RemoveUser, user_id)?;

        let removed = self.locks.with_user_locked(user_id, || {
            self.hashes.remove_credentials(user_id);
            self.gestures.remove_gesture(user_id);
            self.db.write(|tx| SettingsTable::delete_user_tx(tx, user_id))
        })?;
        self.locks.forget_user(user_id);

        tracing::info!(user_id, settings = removed, "Removed lock settings for user");
        Ok(())
    }
}
