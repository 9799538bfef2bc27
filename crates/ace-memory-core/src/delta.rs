//! Incremental changes to a memory store.
//!
//! A `DeltaUpdate` deserializes directly from the curator's JSON output:
//!
//! ```json
//! {
//!   "new_bullets": [{"content": "...", "tags": ["algebra"]}],
//!   "update_bullets": {"bullet_id": {"helpful": 1, "harmful": 0}},
//!   "remove_bullets": ["bullet_id"],
//!   "reasoning": "kept as metadata"
//! }
//! ```
//!
//! Items are decoded one at a time. A malformed item is logged, counted in
//! [`DeltaUpdate::malformed_items`] and dropped; the rest of the delta survives.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::bullet::BulletDraft;
use crate::error::MemoryResult;
use crate::obs;
use crate::refine::RefineReport;

/// Signed counter adjustment for one existing bullet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    #[serde(default)]
    pub helpful: i64,
    #[serde(default)]
    pub harmful: i64,
}

impl CounterDelta {
    pub fn helpful(n: i64) -> Self {
        Self {
            helpful: n,
            harmful: 0,
        }
    }

    pub fn harmful(n: i64) -> Self {
        Self {
            helpful: 0,
            harmful: n,
        }
    }
}

/// New bullets, counter updates and removals, applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDelta")]
pub struct DeltaUpdate {
    pub new_bullets: Vec<BulletDraft>,
    pub update_bullets: BTreeMap<String, CounterDelta>,
    pub remove_bullets: BTreeSet<String>,
    /// Producer-supplied extras. Opaque to the engine.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, Value>,
    /// Items dropped while decoding because they had the wrong shape.
    #[serde(skip)]
    pub malformed_items: usize,
}

/// Wire shape with every item still undecoded.
#[derive(Deserialize)]
struct RawDelta {
    #[serde(default)]
    new_bullets: Option<Vec<Value>>,
    #[serde(default)]
    update_bullets: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    remove_bullets: Option<Vec<Value>>,
    #[serde(flatten)]
    metadata: serde_json::Map<String, Value>,
}

impl From<RawDelta> for DeltaUpdate {
    fn from(raw: RawDelta) -> Self {
        let mut delta = DeltaUpdate {
            metadata: raw.metadata,
            ..DeltaUpdate::default()
        };
        let mut reject = |err: &dyn std::fmt::Display| {
            obs::emit_invalid_skipped(err);
            delta.malformed_items += 1;
        };

        let mut drafts = Vec::new();
        for item in raw.new_bullets.unwrap_or_default() {
            match serde_json::from_value::<BulletDraft>(item) {
                Ok(draft) => drafts.push(draft),
                Err(e) => reject(&e),
            }
        }
        let mut updates = BTreeMap::new();
        for (id, item) in raw.update_bullets.unwrap_or_default() {
            match serde_json::from_value::<CounterDelta>(item) {
                Ok(change) => {
                    updates.insert(id, change);
                }
                Err(e) => reject(&format_args!("update for {id:?}: {e}")),
            }
        }
        let mut removals = BTreeSet::new();
        for item in raw.remove_bullets.unwrap_or_default() {
            match item {
                Value::String(id) => {
                    removals.insert(id);
                }
                other => reject(&format_args!("removal id is not a string: {other}")),
            }
        }

        delta.new_bullets = drafts;
        delta.update_bullets = updates;
        delta.remove_bullets = removals;
        delta
    }
}

impl DeltaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the curator's JSON output. Fails only when the text is not a
    /// JSON object.
    pub fn from_json(text: &str) -> MemoryResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn add(mut self, draft: BulletDraft) -> Self {
        self.new_bullets.push(draft);
        self
    }

    /// Queue a counter change; repeated ids accumulate.
    pub fn update(mut self, id: impl Into<String>, change: CounterDelta) -> Self {
        let entry = self.update_bullets.entry(id.into()).or_default();
        entry.helpful = entry.helpful.saturating_add(change.helpful);
        entry.harmful = entry.harmful.saturating_add(change.harmful);
        self
    }

    pub fn remove(mut self, id: impl Into<String>) -> Self {
        self.remove_bullets.insert(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new_bullets.is_empty()
            && self.update_bullets.is_empty()
            && self.remove_bullets.is_empty()
    }
}

/// What `apply_delta` did with each item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Ids inserted as new bullets.
    pub added: Vec<String>,
    /// Ids of existing bullets that absorbed an incoming bullet with the same id.
    pub merged_existing: Vec<String>,
    /// Ids of incoming bullets dropped as exact duplicates.
    pub dropped_duplicates: Vec<String>,
    /// Items skipped as malformed, while decoding or for blank content.
    pub skipped_invalid: usize,
    pub updated: Vec<String>,
    /// Update ids that matched no bullet.
    pub ignored_updates: Vec<String>,
    pub removed: Vec<String>,
    /// Removal ids that matched no bullet.
    pub ignored_removals: Vec<String>,
    pub refine: RefineReport,
    /// False when the snapshot could not be saved.
    pub persisted: bool,
}
