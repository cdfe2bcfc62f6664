//! Raw credential hash files
//!
//! Each user has at most one non-empty file per credential kind. An empty
//! (or missing) file means no credential is configured, and any candidate
//! matches it. Pattern hashes are stored under one of two names depending on
//! the user's configured pattern size; setting one clears the other.

use crate::config::UnreadableSecretPolicy;
use crate::models::{CredentialKind, SizeVariant, UserId};
use crate::paths::UserPaths;
use crate::{Error, Result};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

/// File-based storage of raw credential hashes
pub struct HashVault {
    paths: UserPaths,
    policy: UnreadableSecretPolicy,
}

impl HashVault {
    /// Create vault over the given layout
    pub fn new(paths: UserPaths, policy: UnreadableSecretPolicy) -> Self {
        Self { paths, policy }
    }

    /// Store `hash` for `kind`; an empty hash clears the credential
    pub fn set_hash(
        &self,
        kind: CredentialKind,
        hash: &[u8],
        user_id: UserId,
        variant: SizeVariant,
    ) -> Result<()> {
        // Clear the other variant first so a failure never leaves two hashes
        if kind == CredentialKind::Pattern {
            let other = self.paths.pattern_file(user_id, variant.other());
            write_file(&other, &[])?;
        }

        let target = self.paths.credential_file(user_id, kind, variant);
        write_file(&target, hash)?;

        tracing::debug!(
            user_id,
            %kind,
            cleared = hash.is_empty(),
            "Stored credential hash"
        );
        Ok(())
    }

    /// Compare `candidate` with the stored hash
    pub fn check_hash(
        &self,
        kind: CredentialKind,
        candidate: &[u8],
        user_id: UserId,
        variant: SizeVariant,
    ) -> Result<bool> {
        let path = self.paths.credential_file(user_id, kind, variant);
        let stored = match std::fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(user_id, %kind, "No {} file, nothing to check against", kind);
                return Ok(true);
            }
            Err(e) => return self.unreadable(kind, user_id, &path, e),
        };

        if stored.is_empty() {
            return Ok(true);
        }
        Ok(stored.as_slice() == candidate)
    }

    fn unreadable(&self, kind: CredentialKind, user_id: UserId, path: &Path, err: io::Error) -> Result<bool> {
        match self.policy {
            UnreadableSecretPolicy::AssumeMatch => {
                tracing::error!(
                    user_id,
                    %kind,
                    "Cannot read file {}: {}; treating as match",
                    path.display(),
                    err
                );
                Ok(true)
            }
            UnreadableSecretPolicy::Reject => {
                tracing::error!(user_id, %kind, "Cannot read file {}: {}", path.display(), err);
                Err(Error::SecretUnavailable(format!(
                    "{} hash for user {} is unreadable: {}",
                    kind, user_id, err
                )))
            }
        }
    }

    /// Move the pattern hash of `user_id` from one size variant to the other
    ///
    /// Nothing happens when `from` holds no hash. Afterwards `from` is empty.
    pub fn move_pattern(&self, user_id: UserId, from: SizeVariant, to: SizeVariant) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let source = self.paths.pattern_file(user_id, from);
        let stored = match std::fs::read(&source) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if stored.is_empty() {
            return Ok(());
        }

        self.set_hash(CredentialKind::Pattern, &stored, user_id, to)?;
        tracing::info!(user_id, "Moved pattern hash after pattern size change");
        Ok(())
    }

    /// Whether a non-empty hash is stored for `kind`
    pub fn have_credential(&self, kind: CredentialKind, user_id: UserId, variant: SizeVariant) -> bool {
        let path = self.paths.credential_file(user_id, kind, variant);
        std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
    }

    /// Delete every hash file of `user_id`, logging failures
    pub fn remove_credentials(&self, user_id: UserId) {
        let files = [
            self.paths.password_file(user_id),
            self.paths.pattern_file(user_id, SizeVariant::Default),
            self.paths.pattern_file(user_id, SizeVariant::Alternate),
        ];
        for file in files {
            remove_file_if_exists(&file);
        }
    }
}

/// Atomically replace `path` with `bytes`
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io(io::Error::new(io::ErrorKind::InvalidInput, "path has no parent")))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Remove `path`, logging anything but "not found"
pub(crate) fn remove_file_if_exists(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn vault(policy: UnreadableSecretPolicy) -> (TempDir, HashVault) {
        let dir = tempdir().unwrap();
        let vault = HashVault::new(UserPaths::new(dir.path()), policy);
        (dir, vault)
    }

    #[test]
    fn test_set_and_check_password() {
        let (_dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let kind = CredentialKind::Password;

        vault.set_hash(kind, &[0xAB, 0xCD], 5, SizeVariant::Default).unwrap();
        assert!(vault.check_hash(kind, &[0xAB, 0xCD], 5, SizeVariant::Default).unwrap());
        assert!(!vault.check_hash(kind, &[0x12, 0x34], 5, SizeVariant::Default).unwrap());
        assert!(vault.have_credential(kind, 5, SizeVariant::Default));
    }

    #[test]
    fn test_shorter_hash_replaces_longer() {
        let (_dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let kind = CredentialKind::Password;

        vault.set_hash(kind, b"a-long-hash", 0, SizeVariant::Default).unwrap();
        vault.set_hash(kind, b"short", 0, SizeVariant::Default).unwrap();
        assert!(vault.check_hash(kind, b"short", 0, SizeVariant::Default).unwrap());
    }

    #[test]
    fn test_empty_hash_clears() {
        let (_dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let kind = CredentialKind::Pattern;

        vault.set_hash(kind, b"pattern", 0, SizeVariant::Default).unwrap();
        vault.set_hash(kind, &[], 0, SizeVariant::Default).unwrap();
        assert!(!vault.have_credential(kind, 0, SizeVariant::Default));
        assert!(vault.check_hash(kind, b"anything", 0, SizeVariant::Default).unwrap());
    }

    #[test]
    fn test_missing_file_matches() {
        let (_dir, vault) = vault(UnreadableSecretPolicy::Reject);
        assert!(vault
            .check_hash(CredentialKind::Password, b"x", 9, SizeVariant::Default)
            .unwrap());
        assert!(!vault.have_credential(CredentialKind::Password, 9, SizeVariant::Default));
    }

    #[test]
    fn test_setting_one_variant_clears_the_other() {
        let (dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let paths = UserPaths::new(dir.path());
        let kind = CredentialKind::Pattern;

        vault.set_hash(kind, b"default", 10, SizeVariant::Default).unwrap();
        vault.set_hash(kind, b"alternate", 10, SizeVariant::Alternate).unwrap();

        assert_eq!(std::fs::read(paths.pattern_file(10, SizeVariant::Default)).unwrap().len(), 0);
        assert!(vault.have_credential(kind, 10, SizeVariant::Alternate));
        assert!(!vault.have_credential(kind, 10, SizeVariant::Default));
    }

    #[test]
    fn test_failed_clear_leaves_target_untouched() {
        let (dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let paths = UserPaths::new(dir.path());
        let kind = CredentialKind::Pattern;

        // A non-empty directory cannot be replaced by the cleared file
        let alternate = paths.pattern_file(10, SizeVariant::Alternate);
        std::fs::create_dir_all(alternate.join("occupied")).unwrap();

        assert!(vault.set_hash(kind, b"default", 10, SizeVariant::Default).is_err());
        assert!(!vault.have_credential(kind, 10, SizeVariant::Default));
    }

    #[test]
    fn test_move_pattern_between_variants() {
        let (dir, vault) = vault(UnreadableSecretPolicy::Reject);
        let paths = UserPaths::new(dir.path());
        let kind = CredentialKind::Pattern;

        vault.set_hash(kind, b"3x3", 2, SizeVariant::Default).unwrap();
        vault.move_pattern(2, SizeVariant::Default, SizeVariant::Alternate).unwrap();

        assert_eq!(std::fs::read(paths.pattern_file(2, SizeVariant::Default)).unwrap().len(), 0);
        assert!(vault.check_hash(kind, b"3x3", 2, SizeVariant::Alternate).unwrap());
        assert!(!vault.check_hash(kind, b"wrong", 2, SizeVariant::Alternate).unwrap());

        // Nothing stored at the source: no-op
        vault.move_pattern(3, SizeVariant::Default, SizeVariant::Alternate).unwrap();
        assert!(!vault.have_credential(kind, 3, SizeVariant::Alternate));
    }

    #[test]
    fn test_unreadable_file_policy() {
        // A directory where the hash file should be cannot be read as a file
        let (dir, reject) = vault(UnreadableSecretPolicy::Reject);
        let paths = UserPaths::new(dir.path());
        std::fs::create_dir_all(paths.password_file(4)).unwrap();

        let err = reject
            .check_hash(CredentialKind::Password, b"x", 4, SizeVariant::Default)
            .unwrap_err();
        assert!(matches!(err, Error::SecretUnavailable(_)));

        let assume = HashVault::new(paths, UnreadableSecretPolicy::AssumeMatch);
        assert!(assume
            .check_hash(CredentialKind::Password, b"x", 4, SizeVariant::Default)
            .unwrap());
    }

    #[test]
    fn test_remove_credentials() {
        let (_dir, vault) = vault(UnreadableSecretPolicy::Reject);

        vault.set_hash(CredentialKind::Password, b"pw", 7, SizeVariant::Default).unwrap();
        vault.set_hash(CredentialKind::Pattern, b"pt", 7, SizeVariant::Alternate).unwrap();
        vault.remove_credentials(7);

        assert!(!vault.have_credential(CredentialKind::Password, 7, SizeVariant::Default));
        assert!(!vault.have_credential(CredentialKind::Pattern, 7, SizeVariant::Alternate));
        vault.remove_credentials(7);
    }
}
