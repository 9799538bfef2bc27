//! ACE Memory Core
//!
//! The memory engine behind an agent's evolving playbook: a bounded collection
//! of short strategy and lesson records ("bullets") that is updated through
//! incremental deltas and queried for prompt context.
//!
//! ## Layer 1 - Engine
//!
//! - `bullet` / `kind` / `digest`: the record model, its memory kinds and identity
//! - `scoring`: decay over the store's logical access clock
//! - `dedup` / `refine`: near-duplicate merging and the size bound
//! - `delta` / `store`: `DeltaUpdate` and `AceMemory::apply_delta`
//! - `retrieve` / `render` / `stats`: the consumer side
//!
//! Persistence lives in `ace-memory-state`.

pub mod bullet;
pub mod config;
pub mod dedup;
pub mod delta;
pub mod digest;
pub mod error;
pub mod kind;
pub mod metrics;
pub mod obs;
pub mod refine;
pub mod render;
pub mod retrieve;
pub mod scoring;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use bullet::{Bullet, BulletDraft, Component, Components};
pub use config::{DecayRates, KindWeights, MemoryConfig, RetrievalWeights};
pub use dedup::MergedPair;
pub use delta::{ApplyReport, CounterDelta, DeltaUpdate};
pub use error::{MemoryError, MemoryResult};
pub use kind::MemoryType;
pub use metrics::MemoryMetrics;
pub use refine::{Eviction, RefineReport};
pub use render::{format_context, CONTEXT_HEADER};
pub use retrieve::RetrieveOptions;
pub use stats::MemoryStatistics;
pub use store::AceMemory;

pub use ace_memory_state::{
    BulletRecord, JsonFileStorage, MemoryStorage, Snapshot, StorageError, StorageResult,
};
