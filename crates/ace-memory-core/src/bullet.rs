//! The bullet: one reusable strategy, lesson or fact.
//!
//! A bullet carries a strength and an access index for each memory kind, but
//! only the component of its active kind is ever non-zero. [`Bullet::normalize`]
//! re-establishes that invariant together with the tag rules and must run after
//! every creation or merge.

use ace_memory_state::BulletRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::digest::{content_hash, derive_id};
use crate::error::{MemoryError, MemoryResult};
use crate::kind::MemoryType;

/// Strength and last-touch clock value of one memory kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub strength: f64,
    pub access_index: u64,
}

/// The three per-kind components of a bullet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub semantic: Component,
    pub episodic: Component,
    pub procedural: Component,
}

impl Components {
    pub fn get(&self, kind: MemoryType) -> &Component {
        match kind {
            MemoryType::Semantic => &self.semantic,
            MemoryType::Episodic => &self.episodic,
            MemoryType::Procedural => &self.procedural,
        }
    }

    pub fn get_mut(&mut self, kind: MemoryType) -> &mut Component {
        match kind {
            MemoryType::Semantic => &mut self.semantic,
            MemoryType::Episodic => &mut self.episodic,
            MemoryType::Procedural => &mut self.procedural,
        }
    }

    /// `(kind, component)` pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (MemoryType, &Component)> {
        MemoryType::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Candidate bullet supplied by a producer, before normalization.
///
/// Field names match the curator's JSON output. Every field may be omitted;
/// a draft without content is rejected later by [`Bullet::from_draft`].
/// Unknown or oddly cased kind labels fall back to inference, and negative
/// counts read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulletDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub memory_type: Option<MemoryType>,
    #[serde(default, deserialize_with = "clamped_count")]
    pub helpful_count: u32,
    #[serde(default, deserialize_with = "clamped_count")]
    pub harmful_count: u32,
    #[serde(default)]
    pub learner_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub concept: Option<String>,
}

fn lenient_kind<'de, D: Deserializer<'de>>(d: D) -> Result<Option<MemoryType>, D::Error> {
    let label = Option::<String>::deserialize(d)?;
    Ok(label.as_deref().and_then(MemoryType::from_label))
}

fn clamped_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let n = Option::<i64>::deserialize(d)?.unwrap_or(0);
    Ok(n.clamp(0, i64::from(u32::MAX)) as u32)
}

impl BulletDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_memory_type(mut self, kind: MemoryType) -> Self {
        self.memory_type = Some(kind);
        self
    }

    pub fn with_helpful(mut self, count: u32) -> Self {
        self.helpful_count = count;
        self
    }

    pub fn with_harmful(mut self, count: u32) -> Self {
        self.harmful_count = count;
        self
    }

    pub fn with_learner(mut self, learner_id: impl Into<String>) -> Self {
        self.learner_id = Some(learner_id.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }
}

/// A normalized memory record owned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: String,
    pub content: String,
    pub helpful_count: u32,
    pub harmful_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub memory_type: MemoryType,
    pub components: Components,
    pub learner_id: Option<String>,
    pub topic: Option<String>,
    pub concept: Option<String>,
    pub content_hash: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl Bullet {
    /// Build a normalized bullet from a producer draft.
    ///
    /// Fails on blank content. The id is the supplied one when non-blank,
    /// otherwise derived from the content; the kind is inferred when absent.
    pub fn from_draft(draft: BulletDraft, now: DateTime<Utc>) -> MemoryResult<Self> {
        if draft.content.trim().is_empty() {
            return Err(MemoryError::InvalidBullet(
                "content must not be empty".to_string(),
            ));
        }
        let id = non_blank(draft.id).unwrap_or_else(|| derive_id(&draft.content));
        let memory_type = draft
            .memory_type
            .unwrap_or_else(|| MemoryType::infer(&draft.content, &draft.tags));

        let mut bullet = Bullet {
            id,
            content_hash: content_hash(&draft.content),
            content: draft.content,
            helpful_count: draft.helpful_count,
            harmful_count: draft.harmful_count,
            created_at: now,
            last_used: None,
            tags: draft.tags,
            memory_type,
            components: Components::default(),
            learner_id: non_blank(draft.learner_id),
            topic: non_blank(draft.topic),
            concept: non_blank(draft.concept),
        };
        bullet.normalize();
        Ok(bullet)
    }

    /// Rebuild a bullet from its persisted record, repairing anything an older
    /// snapshot left out. Fails on blank content.
    pub fn from_record(record: BulletRecord) -> MemoryResult<Self> {
        if record.content.trim().is_empty() {
            return Err(MemoryError::InvalidBullet(format!(
                "record {:?} has empty content",
                record.id
            )));
        }
        let memory_type = record
            .memory_type
            .as_deref()
            .and_then(MemoryType::from_label)
            .unwrap_or_else(|| MemoryType::infer(&record.content, &record.tags));
        let id = non_blank(Some(record.id)).unwrap_or_else(|| derive_id(&record.content));

        let components = Components {
            semantic: Component {
                strength: record.semantic_strength.max(0.0),
                access_index: record.semantic_access_index,
            },
            episodic: Component {
                strength: record.episodic_strength.max(0.0),
                access_index: record.episodic_access_index,
            },
            procedural: Component {
                strength: record.procedural_strength.max(0.0),
                access_index: record.procedural_access_index,
            },
        };

        let mut bullet = Bullet {
            id,
            content_hash: content_hash(&record.content),
            content: record.content,
            helpful_count: record.helpful_count,
            harmful_count: record.harmful_count,
            created_at: record.created_at,
            last_used: record.last_used,
            tags: record.tags,
            memory_type,
            components,
            learner_id: non_blank(record.learner_id),
            topic: non_blank(record.topic),
            concept: non_blank(record.concept),
        };
        bullet.normalize();
        Ok(bullet)
    }

    /// Persisted form with every field written out verbatim.
    pub fn to_record(&self) -> BulletRecord {
        let c = &self.components;
        BulletRecord {
            id: self.id.clone(),
            content: self.content.clone(),
            helpful_count: self.helpful_count,
            harmful_count: self.harmful_count,
            created_at: self.created_at,
            last_used: self.last_used,
            tags: self.tags.clone(),
            memory_type: Some(self.memory_type.label().to_string()),
            semantic_strength: c.semantic.strength,
            episodic_strength: c.episodic.strength,
            procedural_strength: c.procedural.strength,
            semantic_access_index: c.semantic.access_index,
            episodic_access_index: c.episodic.access_index,
            procedural_access_index: c.procedural.access_index,
            learner_id: self.learner_id.clone(),
            topic: self.topic.clone(),
            concept: self.concept.clone(),
            content_hash: Some(self.content_hash.clone()),
        }
    }

    /// Re-establish the strength and tag invariants. Idempotent.
    ///
    /// - The active component's strength becomes
    ///   `max(previous, max(1, helpful_count))`; the other two become zero.
    /// - Tags are trimmed, blank ones dropped, duplicates removed
    ///   case-insensitively (first spelling kept), every kind label removed, and
    ///   the active kind label placed first.
    pub fn normalize(&mut self) {
        let floor = f64::from(self.helpful_count.max(1));
        for kind in MemoryType::ALL {
            let component = self.components.get_mut(kind);
            if kind == self.memory_type {
                component.strength = component.strength.max(floor);
            } else {
                component.strength = 0.0;
            }
        }

        let mut seen: Vec<String> = vec![self.memory_type.label().to_string()];
        let mut tags = vec![self.memory_type.label().to_string()];
        for tag in self.tags.drain(..) {
            let trimmed = tag.trim();
            if trimmed.is_empty() || MemoryType::from_label(trimmed).is_some() {
                continue;
            }
            let folded = trimmed.to_lowercase();
            if seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            tags.push(trimmed.to_string());
        }
        self.tags = tags;
    }

    /// Component of the active kind.
    pub fn active(&self) -> &Component {
        self.components.get(self.memory_type)
    }

    /// Strength of the active kind.
    pub fn strength(&self) -> f64 {
        self.active().strength
    }

    /// Net reinforcement used to pick the canonical bullet in a merge.
    pub fn net_helpfulness(&self) -> i64 {
        i64::from(self.helpful_count) - i64::from(self.harmful_count)
    }

    /// Lowercased tags, the keys under which the store indexes this bullet.
    pub fn tag_keys(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.to_lowercase()).collect()
    }

    /// Apply signed counter deltas, saturating at zero.
    pub fn adjust_counts(&mut self, helpful: i64, harmful: i64) {
        fn apply(count: u32, delta: i64) -> u32 {
            let next = i64::from(count).saturating_add(delta);
            next.clamp(0, i64::from(u32::MAX)) as u32
        }
        self.helpful_count = apply(self.helpful_count, helpful);
        self.harmful_count = apply(self.harmful_count, harmful);
    }

    /// Fold `other`'s counters, tags and missing scope fields into `self`.
    /// Does not renormalize; callers do that once they are done mutating.
    pub fn absorb(&mut self, other: &Bullet) {
        self.helpful_count = self.helpful_count.saturating_add(other.helpful_count);
        self.harmful_count = self.harmful_count.saturating_add(other.harmful_count);
        self.tags.extend(other.tags.iter().cloned());
        if self.learner_id.is_none() {
            self.learner_id = other.learner_id.clone();
        }
        if self.topic.is_none() {
            self.topic = other.topic.clone();
        }
        if self.concept.is_none() {
            self.concept = other.concept.clone();
        }
    }

    /// Prompt line: `[+helpful/-harmful] content`.
    pub fn format_for_prompt(&self) -> String {
        format!(
            "[+{}/-{}] {}",
            self.helpful_count, self.harmful_count, self.content
        )
    }

    /// Description of a broken strength invariant, if any.
    pub(crate) fn strength_violation(&self) -> Option<String> {
        let nonzero: Vec<MemoryType> = self
            .components
            .iter()
            .filter(|(_, c)| c.strength != 0.0)
            .map(|(k, _)| k)
            .collect();
        if self.components.iter().any(|(_, c)| !(c.strength >= 0.0)) {
            return Some("negative or NaN strength".to_string());
        }
        if nonzero != [self.memory_type] {
            return Some(format!(
                "non-zero strengths {:?} for memory type {}",
                nonzero, self.memory_type
            ));
        }
        None
    }
}
