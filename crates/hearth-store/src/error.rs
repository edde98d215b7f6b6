use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error from the SQLite-backed key-value store.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the data directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a collection failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted value could not be decoded.
    #[error("Corrupt value under key {key:?}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Storage key outside the accepted character set.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// A record with the requested id does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The current user lacks the right to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    /// The operation would break a uniqueness invariant.
    #[error("Conflict: {0}")]
    Conflict(&'static str),

    /// Rejected input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The operation needs a signed-in user.
    #[error("No active session")]
    NoSession,

    /// A lock guarding shared state was poisoned by a panicking writer.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
