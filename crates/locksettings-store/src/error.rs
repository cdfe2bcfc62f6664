//! Error types

use crate::access::Operation;
use crate::models::{CallerIdentity, UserId};

/// Lock settings errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller is not allowed to perform the operation
    #[error("{caller} not authorized to {operation} for user {user_id}")]
    PermissionDenied {
        /// Identity that made the call
        caller: CallerIdentity,
        /// Operation that was attempted
        operation: Operation,
        /// Target user
        user_id: UserId,
    },

    /// Database error (transaction did not commit)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Credential or template file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored secret exists but could not be read for comparison
    #[error("Credential check unavailable: {0}")]
    SecretUnavailable(String),

    /// Legacy settings migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is an access-control rejection
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
