//! Error types for the engine and its collaborators.

use thiserror::Error;

/// Errors surfaced by the persistence gateway.
///
/// Command handlers treat any variant the same way: the command is aborted,
/// the acting player gets a generic failure line, and the dispatch loop
/// keeps running.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium failed (I/O, serialization, connection loss).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A referenced record does not exist.
    #[error("Missing record: {0}")]
    MissingRecord(String),

    /// A uniqueness constraint was violated.
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors that abort engine startup or the dispatch loop itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// World data could not be loaded or is unusable.
    #[error("World error: {0}")]
    World(String),

    /// The persistence gateway failed during startup.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
