//! Common error types for Chorus

use thiserror::Error;

/// Common result type for Chorus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by the registries and the coordinator
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed identifier; reported to clients like a missing record
    #[error("{0}")]
    InvalidId(String),

    /// Requested resource not found
    #[error("{0}")]
    NotFound(String),

    /// A rehearsal already exists for the normalized date
    #[error("{0}")]
    Duplicate(String),

    /// Missing required field, bad enum value or unresolved reference
    #[error("{0}")]
    Validation(String),

    /// Some items of a concurrent batch update failed
    #[error("{failed} of {total} updates failed")]
    BatchFailed { failed: usize, total: usize },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidId(_) | Error::NotFound(_) | Error::Duplicate(_) | Error::Validation(_)
        )
    }

    /// True when the store rejected a write because of a unique index
    #[cfg(feature = "sqlx")]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(e) => e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false),
            _ => false,
        }
    }
}
