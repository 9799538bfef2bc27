//! Per-store atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`MemoryMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a tutoring session).

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters owned by one [`crate::AceMemory`].
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    deltas_applied: AtomicU64,
    bullets_added: AtomicU64,
    duplicates_dropped: AtomicU64,
    bullets_merged: AtomicU64,
    bullets_evicted: AtomicU64,
    retrievals: AtomicU64,
    persist_failures: AtomicU64,
}

macro_rules! counter {
    ($field:ident, $inc:ident, $add:ident) => {
        pub fn $inc(&self) {
            self.$add(1);
        }

        pub fn $add(&self, n: u64) {
            if n == 0 {
                return;
            }
            self.$field.fetch_add(n, Ordering::Relaxed);
            tracing::trace!(metric = stringify!($field), n, "counter incremented");
        }

        pub fn $field(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl MemoryMetrics {
    pub const fn new() -> Self {
        Self {
            deltas_applied: AtomicU64::new(0),
            bullets_added: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            bullets_merged: AtomicU64::new(0),
            bullets_evicted: AtomicU64::new(0),
            retrievals: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    counter!(deltas_applied, inc_deltas_applied, add_deltas_applied);
    counter!(bullets_added, inc_bullets_added, add_bullets_added);
    counter!(duplicates_dropped, inc_duplicates_dropped, add_duplicates_dropped);
    counter!(bullets_merged, inc_bullets_merged, add_bullets_merged);
    counter!(bullets_evicted, inc_bullets_evicted, add_bullets_evicted);
    counter!(retrievals, inc_retrievals, add_retrievals);
    counter!(persist_failures, inc_persist_failures, add_persist_failures);

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            deltas_applied = self.deltas_applied(),
            bullets_added = self.bullets_added(),
            duplicates_dropped = self.duplicates_dropped(),
            bullets_merged = self.bullets_merged(),
            bullets_evicted = self.bullets_evicted(),
            retrievals = self.retrievals(),
            persist_failures = self.persist_failures(),
        );
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.deltas_applied,
            &self.bullets_added,
            &self.duplicates_dropped,
            &self.bullets_merged,
            &self.bullets_evicted,
            &self.retrievals,
            &self.persist_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
