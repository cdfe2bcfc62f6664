//! Per-user, per-credential mutual exclusion for file sequences
//!
//! Set and check sequences on the same credential file of the same user run
//! one at a time. Different users and different credentials never contend.

use crate::models::{CredentialKind, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// File-backed secret guarded by a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockSlot {
    /// Pattern or password hash (all size variants share one slot)
    Credential(CredentialKind),
    /// Gesture template file
    Gesture,
}

/// Registry of per-(user, slot) locks
#[derive(Default)]
pub struct CredentialLocks {
    slots: Mutex<HashMap<(UserId, LockSlot), Arc<Mutex<()>>>>,
}

impl CredentialLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: UserId, slot: LockSlot) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry((user_id, slot)).or_default())
    }

    /// Run `f` while holding the lock for `(user_id, slot)`
    pub fn with_lock<T>(&self, user_id: UserId, slot: LockSlot, f: impl FnOnce() -> T) -> T {
        let mutex = self.slot(user_id, slot);
        let _guard = mutex.lock();
        f()
    }

    /// Run `f` while holding every lock of `user_id`
    pub fn with_user_locked<T>(&self, user_id: UserId, f: impl FnOnce() -> T) -> T {
        // Always password, pattern, gesture
        let password = self.slot(user_id, LockSlot::Credential(CredentialKind::Password));
        let pattern = self.slot(user_id, LockSlot::Credential(CredentialKind::Pattern));
        let gesture = self.slot(user_id, LockSlot::Gesture);
        let _password = password.lock();
        let _pattern = pattern.lock();
        let _gesture = gesture.lock();
        f()
    }

    /// Drop the idle locks of `user_id`
    ///
    /// A slot is only dropped when the registry holds its last reference, so
    /// nobody can be holding or waiting on it.
    pub fn forget_user(&self, user_id: UserId) {
        self.slots
            .lock()
            .retain(|(uid, _), slot| *uid != user_id || Arc::strong_count(slot) > 1);
    }

    /// Number of registered slots
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no slot is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
