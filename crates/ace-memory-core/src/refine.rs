//! Grow-and-refine: post-mutation dedup followed by the size bound.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dedup::{self, MergedPair};
use crate::obs;
use crate::store::AceMemory;

/// A bullet removed by the size bound, with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eviction {
    pub id: String,
    pub score: f64,
}

/// What one refine pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineReport {
    pub merged: Vec<MergedPair>,
    pub evicted: Vec<Eviction>,
}

impl RefineReport {
    pub fn is_noop(&self) -> bool {
        self.merged.is_empty() && self.evicted.is_empty()
    }
}

impl AceMemory {
    /// Merge near duplicates, then evict the lowest-ranked bullets until the
    /// store fits `max_bullets`. Does not persist.
    pub(crate) fn refine(&mut self) -> RefineReport {
        let mut report = RefineReport {
            merged: self.merge_near_duplicates(),
            evicted: Vec::new(),
        };
        report.evicted = self.prune();
        report
    }

    fn merge_near_duplicates(&mut self) -> Vec<MergedPair> {
        let live: Vec<_> = self.bullets.values().cloned().collect();
        let (survivors, merges) = dedup::sweep(live, self.config().dedup_threshold);
        if merges.is_empty() {
            return merges;
        }

        for pair in &merges {
            self.unregister(&pair.absorbed);
            obs::emit_bullets_merged(&pair.keeper, &pair.absorbed, pair.similarity);
        }

        let mut survivors: HashMap<String, _> =
            survivors.into_iter().map(|b| (b.id.clone(), b)).collect();
        for pair in &merges {
            // Repeat keepers, and keepers that later lost a merge, are skipped.
            if let Some(keeper) = survivors.remove(&pair.keeper) {
                self.replace(keeper);
                self.touch(&pair.keeper);
            }
        }

        self.metrics.add_bullets_merged(merges.len() as u64);
        merges
    }

    fn prune(&mut self) -> Vec<Eviction> {
        let max = self.config().max_bullets;
        if self.bullets.len() <= max {
            return Vec::new();
        }

        let mut ranked: Vec<(f64, u32, String)> = self
            .bullets
            .values()
            .map(|b| (self.score(b), b.helpful_count, b.id.clone()))
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        let evicted: Vec<Eviction> = ranked
            .into_iter()
            .skip(max)
            .map(|(score, _, id)| Eviction { id, score })
            .collect();
        for eviction in &evicted {
            self.unregister(&eviction.id);
            obs::emit_bullet_evicted(&eviction.id, eviction.score);
        }
        self.metrics.add_bullets_evicted(evicted.len() as u64);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use crate::bullet::BulletDraft;
    use crate::config::MemoryConfig;
    use crate::delta::DeltaUpdate;
    use crate::kind::MemoryType;
    use crate::store::AceMemory;

    #[test]
    fn test_refine_noop_on_small_distinct_store() {
        let mut m = AceMemory::in_memory(MemoryConfig::default()).unwrap();
        let report = m.apply_delta(
            DeltaUpdate::new()
                .add(BulletDraft::new("Draw a number line"))
                .add(BulletDraft::new("Negative times negative is positive")),
        );
        assert!(report.refine.is_noop());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_prune_keeps_highest_scores() {
        let config = MemoryConfig::default().with_max_bullets(2);
        let mut m = AceMemory::in_memory(config).unwrap();
        let report = m.apply_delta(
            DeltaUpdate::new()
                .add(
                    BulletDraft::new("alpha")
                        .with_memory_type(MemoryType::Semantic)
                        .with_helpful(5),
                )
                .add(
                    BulletDraft::new("beta")
                        .with_memory_type(MemoryType::Semantic)
                        .with_helpful(1),
                )
                .add(
                    BulletDraft::new("gamma")
                        .with_memory_type(MemoryType::Semantic)
                        .with_helpful(3),
                ),
        );
        assert_eq!(m.len(), 2);
        assert_eq!(report.refine.evicted.len(), 1);
        let evicted = &report.refine.evicted[0];
        assert!(m.get(&evicted.id).is_none());
        assert!(m.bullets().all(|b| b.content != "beta"));
        assert_eq!(m.metrics().bullets_evicted(), 1);
        m.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_keeper_is_retouched() {
        let mut m = AceMemory::in_memory(MemoryConfig::default()).unwrap();
        let report = m.apply_delta(
            DeltaUpdate::new()
                .add(
                    BulletDraft::new("Use the calculator for multiplication problems")
                        .with_helpful(2),
                )
                .add(
                    BulletDraft::new("Use the calculator for multiplication problems always")
                        .with_helpful(3),
                ),
        );
        assert_eq!(report.refine.merged.len(), 1);
        assert_eq!(m.len(), 1);
        // Two inserts plus the keeper's re-touch.
        assert_eq!(m.access_clock(), 3);
        let keeper = m.bullets().next().unwrap();
        assert_eq!(keeper.helpful_count, 5);
        assert_eq!(keeper.active().access_index, 3);
        m.check_invariants().unwrap();
    }
}
