//! ACE Memory State: snapshot schema and storage backends
//!
//! This crate provides the persistence layer for the ACE memory engine. It knows
//! nothing about scoring or deduplication; it moves whole snapshots of a
//! learner's playbook in and out of a backend.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: durable snapshots, atomic replacement, tolerant decoding of older
//! snapshot versions.
//!
//! ## Key Components
//!
//! - `MemoryStorage`: synchronous load/save interface implemented by every backend
//! - `Snapshot` / `BulletRecord`: the serialized form of a store
//! - `JsonFileStorage`: flat-file backend with write-then-swap persistence
//! - `fakes`: in-memory and always-failing backends for tests

mod error;
pub mod fakes;
pub mod fs;
mod snapshot;
pub mod storage_traits;

pub use error::StorageError;
pub use fs::JsonFileStorage;
pub use snapshot::{BulletRecord, Snapshot, LEGACY_SNAPSHOT_VERSION, SNAPSHOT_VERSION};
pub use storage_traits::{MemoryStorage, StorageResult};
