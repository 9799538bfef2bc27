//! Structured observability hooks for memory lifecycle events.
//!
//! This module provides:
//! - Operation-scoped tracing spans via the `MemorySpan` RAII guard
//! - Emission functions for delta application, dedup, eviction, retrieval and persistence
//!
//! Every event carries an `event = "memory.*"` field so log pipelines can
//! filter on it regardless of formatter.

use tracing::{debug, info, warn};

/// RAII guard that enters an `ace.memory` span for the duration of an operation.
///
/// ```ignore
/// let _span = MemorySpan::enter("apply_delta", "file:/data/ace_memory_alice.json");
/// ```
pub struct MemorySpan {
    _span: tracing::span::EnteredSpan,
}

impl MemorySpan {
    pub fn enter(operation: &str, scope: &str) -> Self {
        let span = tracing::info_span!("ace.memory", op = %operation, scope = %scope);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a delta was applied.
pub fn emit_delta_applied(added: usize, updated: usize, removed: usize, total: usize) {
    info!(
        event = "memory.delta_applied",
        added = added,
        updated = updated,
        removed = removed,
        total_bullets = total,
    );
}

/// Emit event: an incoming bullet duplicated existing content and was dropped.
pub fn emit_duplicate_dropped(incoming_id: &str, existing_id: &str) {
    debug!(
        event = "memory.duplicate_dropped",
        incoming_id = %incoming_id,
        existing_id = %existing_id,
    );
}

/// Emit event: a malformed delta item was skipped.
pub fn emit_invalid_skipped(error: &dyn std::fmt::Display) {
    warn!(event = "memory.invalid_skipped", error = %error);
}

/// Emit event: two near-duplicate bullets were merged.
pub fn emit_bullets_merged(keeper: &str, absorbed: &str, similarity: f64) {
    debug!(
        event = "memory.bullets_merged",
        keeper = %keeper,
        absorbed = %absorbed,
        similarity = similarity,
    );
}

/// Emit event: a bullet was evicted by the size bound.
pub fn emit_bullet_evicted(id: &str, score: f64) {
    info!(event = "memory.bullet_evicted", bullet_id = %id, score = score);
}

/// Emit event: a retrieval was served.
pub fn emit_retrieval(candidates: usize, returned: usize) {
    debug!(
        event = "memory.retrieval",
        candidates = candidates,
        returned = returned,
    );
}

/// Emit event: a snapshot was loaded into the store.
pub fn emit_snapshot_loaded(bullets: usize, access_clock: u64, legacy: bool) {
    info!(
        event = "memory.snapshot_loaded",
        bullets = bullets,
        access_clock = access_clock,
        legacy = legacy,
    );
}

/// Emit event: loading failed and the store starts empty (warning level).
pub fn emit_load_failed(scope: &str, error: &dyn std::fmt::Display) {
    warn!(event = "memory.load_failed", scope = %scope, error = %error);
}

/// Emit event: persisting a snapshot failed; in-memory state stays authoritative.
pub fn emit_persist_failed(scope: &str, error: &dyn std::fmt::Display) {
    warn!(event = "memory.persist_failed", scope = %scope, error = %error);
}
