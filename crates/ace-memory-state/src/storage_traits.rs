//! Storage trait definition for ACE memory
//!
//! A backend persists exactly one store scope (typically one learner). The
//! interface is synchronous: load and save are short, isolated calls made by the
//! owning store, and callers wrap them in their own timeouts if they need any.
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use crate::error::StorageError;
use crate::snapshot::Snapshot;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Snapshot persistence backend.
///
/// Guarantees:
/// - `load()` returns `Ok(None)` when nothing has been saved yet; it errors only
///   on genuine I/O or decode failures.
/// - `save(s)` replaces the stored snapshot as a whole; a failed save leaves the
///   previously stored snapshot intact.
/// - After a successful `save(s)`, `load()` returns a snapshot equal to `s`.
pub trait MemoryStorage: Send + Sync {
    /// Read the last saved snapshot, if any.
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Persist the full snapshot, replacing any previous one.
    fn save(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
