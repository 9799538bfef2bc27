//! Aggregate statistics over a store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::AceMemory;

/// Snapshot of store-wide averages and tag bucket sizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub total_bullets: usize,
    pub avg_score: f64,
    pub avg_helpful: f64,
    pub avg_harmful: f64,
    /// Lowercased tag -> number of bullets carrying it.
    pub categories: BTreeMap<String, usize>,
}

impl AceMemory {
    /// Averages over live bullets; all zero for an empty store.
    pub fn statistics(&self) -> MemoryStatistics {
        let total = self.len();
        if total == 0 {
            return MemoryStatistics::default();
        }

        let (mut score, mut helpful, mut harmful) = (0.0, 0.0, 0.0);
        for bullet in self.bullets() {
            score += self.score(bullet);
            helpful += f64::from(bullet.helpful_count);
            harmful += f64::from(bullet.harmful_count);
        }
        let n = total as f64;

        MemoryStatistics {
            total_bullets: total,
            avg_score: score / n,
            avg_helpful: helpful / n,
            avg_harmful: harmful / n,
            categories: self
                .categories
                .iter()
                .map(|(tag, ids)| (tag.clone(), ids.len()))
                .collect(),
        }
    }
}
