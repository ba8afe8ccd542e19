//! Error types for the chat-ledger library.
//!
//! This module provides custom error types using `thiserror` for better error
//! handling and more specific error messages throughout the crate.

use thiserror::Error;

/// Errors that can occur in the chat-ledger crate.
#[derive(Error, Debug)]
pub enum ChatLedgerError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Two edits raced for the same version slot; the unique
    /// (message, version) constraint rejected the loser
    #[error("Edit conflict on message {message_id}: version {version} already exists")]
    EditConflict {
        /// Message whose history the edit targeted
        message_id: i64,
        /// Version number both edits computed
        version: i64,
    },

    /// Caller lacks the right to act on a message or thread
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Input rejected before any persistence occurred
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `ChatLedgerError`
pub type Result<T> = std::result::Result<T, ChatLedgerError>;

impl From<anyhow::Error> for ChatLedgerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// True when the underlying SQLite error is a UNIQUE constraint violation.
///
/// Used by the edit path to surface a lost version race as [`ChatLedgerError::EditConflict`]
/// instead of a generic database error.
#[must_use]
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
