//! Error types for the memory engine.

use ace_memory_state::StorageError;

/// Errors produced by memory operations.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("invalid bullet: {0}")]
    InvalidBullet(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invariant violated for {id}: {detail}")]
    InvariantViolation { id: String, detail: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for memory operations.
pub type MemoryResult<T> = std::result::Result<T, MemoryError>;
