//! Caller access policy
//!
//! Every public store operation belongs to one access class. The gate is
//! evaluated before any database or file access takes place.

use crate::models::{CallerContext, CallerIdentity, UserId};
use crate::{Error, Result};
use std::fmt;

/// Access class of a store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    /// Mutations: system caller only
    Write,
    /// Secret comparisons: system caller only
    SecretRead,
    /// Plain reads: system caller or the target user itself
    Read,
}

/// Public store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Write a boolean setting
    SetBoolean,
    /// Write an integer setting
    SetLong,
    /// Write a string setting
    SetString,
    /// Read a boolean setting
    GetBoolean,
    /// Read an integer setting
    GetLong,
    /// Read a string setting
    GetString,
    /// Read the configured pattern size
    GetLockPatternSize,
    /// Store a pattern hash
    SetLockPattern,
    /// Compare a pattern hash
    CheckPattern,
    /// Store a password hash
    SetLockPassword,
    /// Compare a password hash
    CheckPassword,
    /// Store a gesture template
    SetLockGesture,
    /// Match a gesture sample
    CheckGesture,
    /// Query password presence
    HavePassword,
    /// Query pattern presence
    HavePattern,
    /// Query gesture presence
    HaveGesture,
    /// Drop all data of a user
    RemoveUser,
    /// Run startup migration
    SystemReady,
}

impl Operation {
    /// Access class this operation is checked against
    pub fn class(self) -> AccessClass {
        use Operation::*;
        match self {
            SetBoolean | SetLong | SetString | SetLockPattern | SetLockPassword
            | SetLockGesture | RemoveUser | SystemReady => AccessClass::Write,
            CheckPattern | CheckPassword | CheckGesture => AccessClass::SecretRead,
            GetBoolean | GetLong | GetString | GetLockPatternSize | HavePassword
            | HavePattern | HaveGesture => AccessClass::Read,
        }
    }

    fn name(self) -> &'static str {
        use Operation::*;
        match self {
            SetBoolean => "setBoolean",
            SetLong => "setLong",
            SetString => "setString",
            GetBoolean => "getBoolean",
            GetLong => "getLong",
            GetString => "getString",
            GetLockPatternSize => "getLockPatternSize",
            SetLockPattern => "setLockPattern",
            CheckPattern => "checkPattern",
            SetLockPassword => "setLockPassword",
            CheckPassword => "checkPassword",
            SetLockGesture => "setLockGesture",
            CheckGesture => "checkGesture",
            HavePassword => "havePassword",
            HavePattern => "havePattern",
            HaveGesture => "haveGesture",
            RemoveUser => "removeUser",
            SystemReady => "systemReady",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluates caller identities against the per-operation policy
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessGate;

impl AccessGate {
    /// Check that `ctx` may run `operation` on behalf of `user_id`
    pub fn check(&self, ctx: &CallerContext, operation: Operation, user_id: UserId) -> Result<()> {
        let allowed = match (operation.class(), ctx.identity) {
            (_, CallerIdentity::System) => true,
            (AccessClass::Read, CallerIdentity::User(caller)) => caller == user_id,
            (AccessClass::Write | AccessClass::SecretRead, CallerIdentity::User(_)) => false,
        };

        if allowed {
            return Ok(());
        }

        tracing::warn!(
            caller = %ctx.identity,
            %operation,
            user_id,
            "Rejected lock settings call"
        );
        Err(Error::PermissionDenied {
            caller: ctx.identity,
            operation,
            user_id,
        })
    }
}
