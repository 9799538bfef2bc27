//! The memory store: bullets, their derived indices, and delta application.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use ace_memory_state::fakes::InMemoryStorage;
use ace_memory_state::{JsonFileStorage, MemoryStorage, Snapshot};
use chrono::{DateTime, Utc};

use crate::bullet::{Bullet, BulletDraft};
use crate::config::MemoryConfig;
use crate::delta::{ApplyReport, CounterDelta, DeltaUpdate};
use crate::error::{MemoryError, MemoryResult};
use crate::metrics::MemoryMetrics;
use crate::obs::{self, MemorySpan};
use crate::scoring;

/// One learner's evolving playbook.
///
/// Mutating operations take `&mut self`; a store has a single owner. Storage
/// failures never abort an operation: a failed load starts the store empty and
/// a failed save leaves the in-memory state authoritative.
pub struct AceMemory {
    config: MemoryConfig,
    storage: Arc<dyn MemoryStorage>,
    scope: String,
    pub(crate) bullets: HashMap<String, Bullet>,
    /// Lowercased tag -> ids carrying it.
    pub(crate) categories: BTreeMap<String, BTreeSet<String>>,
    /// Content hash -> ids with that content.
    hash_index: HashMap<String, BTreeSet<String>>,
    pub(crate) access_clock: u64,
    pub(crate) metrics: MemoryMetrics,
}

impl std::fmt::Debug for AceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AceMemory")
            .field("scope", &self.scope)
            .field("bullets", &self.bullets.len())
            .field("access_clock", &self.access_clock)
            .finish()
    }
}

impl AceMemory {
    /// Open a store over `storage`, loading whatever it holds.
    ///
    /// Only an invalid `config` is an error; an unreadable snapshot is logged
    /// and the store starts empty.
    pub fn open(config: MemoryConfig, storage: Arc<dyn MemoryStorage>) -> MemoryResult<Self> {
        config.validate()?;
        let scope = storage.describe();
        let mut memory = Self {
            config,
            storage,
            scope,
            bullets: HashMap::new(),
            categories: BTreeMap::new(),
            hash_index: HashMap::new(),
            access_clock: 0,
            metrics: MemoryMetrics::new(),
        };

        match memory.storage.load() {
            Ok(Some(snapshot)) => memory.restore(snapshot),
            Ok(None) => {}
            Err(e) => obs::emit_load_failed(&memory.scope, &e),
        }
        Ok(memory)
    }

    /// Store backed by nothing but process memory.
    pub fn in_memory(config: MemoryConfig) -> MemoryResult<Self> {
        Self::open(config, Arc::new(InMemoryStorage::new()))
    }

    /// Store persisted to `<root>/ace_memory_<learner>.json`.
    pub fn for_learner(
        root: impl AsRef<Path>,
        learner_id: &str,
        config: MemoryConfig,
    ) -> MemoryResult<Self> {
        let storage = JsonFileStorage::for_learner(root, learner_id)?;
        Self::open(config, Arc::new(storage))
    }

    // -- delta application --------------------------------------------------

    /// Apply additions, then updates, then removals, then refine, then persist.
    ///
    /// Individual items never fail the call: malformed additions are skipped
    /// and unknown ids are ignored, all recorded in the returned report.
    pub fn apply_delta(&mut self, delta: DeltaUpdate) -> ApplyReport {
        let _span = MemorySpan::enter("apply_delta", &self.scope);
        let now = Utc::now();
        let mut report = ApplyReport {
            skipped_invalid: delta.malformed_items,
            ..ApplyReport::default()
        };

        for draft in delta.new_bullets {
            self.add_draft(draft, now, &mut report);
        }
        for (id, change) in delta.update_bullets {
            if self.update_counts(&id, change) {
                report.updated.push(id);
            } else {
                report.ignored_updates.push(id);
            }
        }
        for id in delta.remove_bullets {
            if self.unregister(&id).is_some() {
                report.removed.push(id);
            } else {
                report.ignored_removals.push(id);
            }
        }

        report.refine = self.refine();
        report.persisted = self.persist_logged();

        self.metrics.inc_deltas_applied();
        obs::emit_delta_applied(
            report.added.len(),
            report.updated.len(),
            report.removed.len(),
            self.bullets.len(),
        );
        report
    }

    fn add_draft(&mut self, draft: BulletDraft, now: DateTime<Utc>, report: &mut ApplyReport) {
        let incoming = match Bullet::from_draft(draft, now) {
            Ok(bullet) => bullet,
            Err(e) => {
                obs::emit_invalid_skipped(&e);
                report.skipped_invalid += 1;
                return;
            }
        };

        if let Some(existing) = self.bullets.get(&incoming.id) {
            let mut merged = existing.clone();
            merged.absorb(&incoming);
            merged.normalize();
            let id = merged.id.clone();
            self.replace(merged);
            self.touch(&id);
            report.merged_existing.push(id);
            return;
        }

        if let Some(existing_id) = self.find_exact_duplicate(&incoming) {
            obs::emit_duplicate_dropped(&incoming.id, &existing_id);
            self.metrics.inc_duplicates_dropped();
            report.dropped_duplicates.push(incoming.id);
            return;
        }

        let id = incoming.id.clone();
        self.register(incoming);
        self.touch(&id);
        self.metrics.inc_bullets_added();
        report.added.push(id);
    }

    fn update_counts(&mut self, id: &str, change: CounterDelta) -> bool {
        let Some(bullet) = self.bullets.get_mut(id) else {
            return false;
        };
        bullet.adjust_counts(change.helpful, change.harmful);
        bullet.normalize();
        self.reindex_hash(id);
        self.touch(id);
        true
    }

    /// Id of a live bullet with the same content hash and the same
    /// `(memory_type, learner_id, topic)` scope as `candidate`.
    fn find_exact_duplicate(&self, candidate: &Bullet) -> Option<String> {
        self.hash_index
            .get(&candidate.content_hash)?
            .iter()
            .filter_map(|id| self.bullets.get(id))
            .find(|b| {
                b.memory_type == candidate.memory_type
                    && b.learner_id == candidate.learner_id
                    && b.topic == candidate.topic
            })
            .map(|b| b.id.clone())
    }

    // -- index maintenance --------------------------------------------------

    /// Advance the clock and stamp the active component of `id`.
    pub(crate) fn touch(&mut self, id: &str) {
        let Some(bullet) = self.bullets.get_mut(id) else {
            return;
        };
        self.access_clock += 1;
        let kind = bullet.memory_type;
        bullet.components.get_mut(kind).access_index = self.access_clock;
        bullet.last_used = Some(Utc::now());
    }

    /// Insert `bullet` into the map and every index.
    pub(crate) fn register(&mut self, bullet: Bullet) {
        for key in bullet.tag_keys() {
            self.categories
                .entry(key)
                .or_default()
                .insert(bullet.id.clone());
        }
        self.hash_index
            .entry(bullet.content_hash.clone())
            .or_default()
            .insert(bullet.id.clone());
        self.bullets.insert(bullet.id.clone(), bullet);
    }

    /// Remove `id` from the map and every index.
    pub(crate) fn unregister(&mut self, id: &str) -> Option<Bullet> {
        let bullet = self.bullets.remove(id)?;
        for key in bullet.tag_keys() {
            if let Some(ids) = self.categories.get_mut(&key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.categories.remove(&key);
                }
            }
        }
        if let Some(ids) = self.hash_index.get_mut(&bullet.content_hash) {
            ids.remove(id);
            if ids.is_empty() {
                self.hash_index.remove(&bullet.content_hash);
            }
        }
        Some(bullet)
    }

    /// Swap in a new version of a bullet, re-registering its tags and hash.
    pub(crate) fn replace(&mut self, bullet: Bullet) {
        self.unregister(&bullet.id);
        self.register(bullet);
    }

    fn reindex_hash(&mut self, id: &str) {
        if let Some(hash) = self.bullets.get(id).map(|b| b.content_hash.clone()) {
            self.hash_index.entry(hash).or_default().insert(id.to_string());
        }
    }

    // -- persistence --------------------------------------------------------

    /// Current state in its persisted form, bullets ordered by id.
    pub fn snapshot(&self) -> Snapshot {
        let mut records: Vec<_> = self.bullets.values().map(Bullet::to_record).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot::new(records, self.access_clock)
    }

    /// Save now, returning the storage error to the caller.
    pub fn flush(&self) -> MemoryResult<()> {
        self.storage.save(&self.snapshot())?;
        Ok(())
    }

    fn persist_logged(&self) -> bool {
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                self.metrics.inc_persist_failures();
                obs::emit_persist_failed(&self.scope, &e);
                false
            }
        }
    }

    /// Replace the (empty) store contents with `snapshot`, repairing records
    /// from older versions, then refine without saving.
    fn restore(&mut self, snapshot: Snapshot) {
        let legacy = snapshot.is_legacy();
        let mut highest_index = 0;

        for record in snapshot.bullets {
            let bullet = match Bullet::from_record(record) {
                Ok(bullet) => bullet,
                Err(e) => {
                    obs::emit_invalid_skipped(&e);
                    continue;
                }
            };
            highest_index = bullet
                .components
                .iter()
                .map(|(_, c)| c.access_index)
                .fold(highest_index, u64::max);

            match self.bullets.get(&bullet.id) {
                Some(existing) => {
                    let mut merged = existing.clone();
                    merged.absorb(&bullet);
                    merged.normalize();
                    self.replace(merged);
                }
                None => self.register(bullet),
            }
        }

        self.access_clock = snapshot.access_clock.max(highest_index);
        self.refine();
        obs::emit_snapshot_loaded(self.bullets.len(), self.access_clock, legacy);
    }

    /// Drop every bullet, then persist. The access clock keeps running.
    ///
    /// Returns whether the empty snapshot was saved.
    pub fn clear(&mut self) -> bool {
        self.bullets.clear();
        self.categories.clear();
        self.hash_index.clear();
        self.persist_logged()
    }

    // -- accessors ----------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&Bullet> {
        self.bullets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bullets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }

    /// All live bullets, in no particular order.
    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.values()
    }

    pub fn access_clock(&self) -> u64 {
        self.access_clock
    }

    pub(crate) fn score(&self, bullet: &Bullet) -> f64 {
        scoring::score(bullet, self.access_clock, &self.config.decay_rates)
    }

    /// Current decayed score of `id`.
    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.bullets.get(id).map(|b| self.score(b))
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MemoryMetrics {
        &self.metrics
    }

    /// Human-readable name of the backing storage.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Ids indexed under `tag` (case-insensitive).
    pub fn ids_tagged(&self, tag: &str) -> Vec<&str> {
        self.categories
            .get(&tag.to_lowercase())
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    // -- invariants ---------------------------------------------------------

    /// Verify the record and index invariants, reporting the first violation.
    pub fn check_invariants(&self) -> MemoryResult<()> {
        let violation = |id: &str, detail: String| MemoryError::InvariantViolation {
            id: id.to_string(),
            detail,
        };

        if self.bullets.len() > self.config.max_bullets {
            return Err(violation(
                "*",
                format!(
                    "{} bullets exceed max_bullets {}",
                    self.bullets.len(),
                    self.config.max_bullets
                ),
            ));
        }

        for (id, bullet) in &self.bullets {
            if id != &bullet.id {
                return Err(violation(id, format!("stored under key for {}", bullet.id)));
            }
            if let Some(detail) = bullet.strength_violation() {
                return Err(violation(id, detail));
            }
            if bullet.tags.first().map(String::as_str) != Some(bullet.memory_type.label()) {
                return Err(violation(id, "memory type label is not the first tag".into()));
            }
            for key in bullet.tag_keys() {
                if !self.categories.get(&key).is_some_and(|ids| ids.contains(id)) {
                    return Err(violation(id, format!("missing from tag bucket {key:?}")));
                }
            }
            if !self
                .hash_index
                .get(&bullet.content_hash)
                .is_some_and(|ids| ids.contains(id))
            {
                return Err(violation(id, "missing from hash index".into()));
            }
            if bullet.active().access_index > self.access_clock {
                return Err(violation(id, "access index ahead of the clock".into()));
            }
        }

        for (tag, ids) in &self.categories {
            for id in ids {
                match self.bullets.get(id) {
                    Some(b) if b.tag_keys().contains(tag) => {}
                    Some(_) => return Err(violation(id, format!("stale tag bucket {tag:?}"))),
                    None => return Err(violation(id, format!("dangling id in tag {tag:?}"))),
                }
            }
        }
        for (hash, ids) in &self.hash_index {
            for id in ids {
                match self.bullets.get(id) {
                    Some(b) if &b.content_hash == hash => {}
                    Some(_) => return Err(violation(id, "stale hash index entry".into())),
                    None => return Err(violation(id, "dangling id in hash index".into())),
                }
            }
        }
        Ok(())
    }
}
