//! In-memory fakes for the storage trait
//!
//! Provides `InMemoryStorage`, which satisfies the trait contract without touching
//! disk (also the backend of ephemeral stores), and `UnavailableStorage`, which
//! fails every call so callers can exercise their cold-start and save-failure
//! paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::snapshot::Snapshot;
use crate::storage_traits::{MemoryStorage, StorageResult};

// ---------------------------------------------------------------------------
// InMemoryStorage
// ---------------------------------------------------------------------------

/// Snapshot backend held in a `Mutex<Option<Snapshot>>`.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    snapshot: Mutex<Option<Snapshot>>,
    saves: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with `snapshot`, as if it had been saved earlier.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Copy of the stored snapshot.
    pub fn stored(&self) -> Option<Snapshot> {
        self.snapshot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl MemoryStorage for InMemoryStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        *guard = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

// ---------------------------------------------------------------------------
// UnavailableStorage
// ---------------------------------------------------------------------------

/// Backend whose every call fails with `StorageError::Backend`.
#[derive(Debug, Default)]
pub struct UnavailableStorage {
    attempts: AtomicUsize,
}

impl UnavailableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of load and save calls attempted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl MemoryStorage for UnavailableStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(StorageError::Backend("storage unavailable".to_string()))
    }

    fn save(&self, _snapshot: &Snapshot) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(StorageError::Backend("storage unavailable".to_string()))
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}
