//! On-disk layout of per-user credential files
//!
//! User 0 keeps its files directly in the shared system directory so that
//! devices provisioned before multi-user support keep working. Every other
//! user gets `system/users/<id>/`.

use crate::models::{CredentialKind, SizeVariant, UserId, SYSTEM_USER};
use std::path::{Path, PathBuf};

/// System directory below the data root
pub const SYSTEM_DIRECTORY: &str = "system";
/// Per-user directories below the system directory
pub const USERS_DIRECTORY: &str = "users";
/// Settings database file name
pub const DATABASE_FILE: &str = "locksettings.db";
/// Pattern hash file name
pub const LOCK_PATTERN_FILE: &str = "gesture.key";
/// Prefix for the alternate-size pattern hash file
pub const ALTERNATE_SIZE_PREFIX: &str = "cm_";
/// Password hash file name
pub const LOCK_PASSWORD_FILE: &str = "password.key";
/// Gesture template file name
pub const LOCK_GESTURE_FILE: &str = "lock_gesture.key";

/// Resolves file locations for each user
#[derive(Debug, Clone)]
pub struct UserPaths {
    system_dir: PathBuf,
}

impl UserPaths {
    /// Layout rooted at `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            system_dir: data_dir.as_ref().join(SYSTEM_DIRECTORY),
        }
    }

    /// Shared system directory
    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    /// Settings database location
    pub fn database_path(&self) -> PathBuf {
        self.system_dir.join(DATABASE_FILE)
    }

    /// Directory holding the credential files of `user_id`
    pub fn user_dir(&self, user_id: UserId) -> PathBuf {
        if user_id == SYSTEM_USER {
            self.system_dir.clone()
        } else {
            self.system_dir
                .join(USERS_DIRECTORY)
                .join(user_id.to_string())
        }
    }

    /// Hash file for `kind`; only patterns have a size variant
    pub fn credential_file(&self, user_id: UserId, kind: CredentialKind, variant: SizeVariant) -> PathBuf {
        match kind {
            CredentialKind::Pattern => self.pattern_file(user_id, variant),
            CredentialKind::Password => self.password_file(user_id),
        }
    }

    /// Pattern hash file for the given size variant
    pub fn pattern_file(&self, user_id: UserId, variant: SizeVariant) -> PathBuf {
        let name = match variant {
            SizeVariant::Default => LOCK_PATTERN_FILE.to_string(),
            SizeVariant::Alternate => format!("{}{}", ALTERNATE_SIZE_PREFIX, LOCK_PATTERN_FILE),
        };
        self.user_dir(user_id).join(name)
    }

    /// Password hash file
    pub fn password_file(&self, user_id: UserId) -> PathBuf {
        self.user_dir(user_id).join(LOCK_PASSWORD_FILE)
    }

    /// Gesture template file
    pub fn gesture_file(&self, user_id: UserId) -> PathBuf {
        self.user_dir(user_id).join(LOCK_GESTURE_FILE)
    }
}
