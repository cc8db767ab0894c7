//! Error types for the balance ledger
//!
//! Business outcomes (insufficient funds, unknown player) are never errors;
//! they are reported through `bool` / `0.0` return values. Only misuse and
//! unrecoverable data problems surface here.

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Registry used before a ledger was installed
    #[error("Economy API not initialized")]
    NotInitialized,

    /// Registry already holds a ledger
    #[error("Economy API already initialized")]
    AlreadyInitialized,

    /// Persisted identity is not a valid UUID
    #[error("Invalid player identity {identity:?}: {source}")]
    InvalidIdentity {
        /// Raw identity string as found in the snapshot
        identity: String,
        /// Parse failure
        #[source]
        source: uuid::Error,
    },

    /// Persisted balance data has the wrong shape
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
