//! Error types for ace-memory-state

use thiserror::Error;

/// Errors that can occur in the snapshot persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem or device failure
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored bytes are not a valid snapshot
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Scope identifier cannot be mapped onto the backend
    #[error("Invalid storage scope: {0:?}")]
    InvalidScope(String),

    /// Backend-specific failure (unavailable service, poisoned state, ...)
    #[error("Storage backend failed: {0}")]
    Backend(String),
}
