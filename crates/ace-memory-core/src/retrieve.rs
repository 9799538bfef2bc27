//! Query-time filtering and ranking.
//!
//! Retrieval is a reinforcing access: every bullet it returns is touched, so
//! strategies that keep getting used decay more slowly than ones that don't.

use std::collections::BTreeSet;

use crate::bullet::Bullet;
use crate::kind::MemoryType;
use crate::obs::{self, MemorySpan};
use crate::similarity::{jaccard, token_set};
use crate::store::AceMemory;

/// Filters and ranking hints for [`AceMemory::retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveOptions {
    /// Keep bullets carrying any of these tags (case-insensitive). Empty keeps all.
    pub tags: Vec<String>,
    /// Keep bullets of these kinds. Empty keeps all.
    pub memory_types: Vec<MemoryType>,
    pub learner_id: Option<String>,
    pub topic: Option<String>,
    pub min_score: Option<f64>,
    /// When true, `learner_id` and `topic` filter exactly; when false they only
    /// adjust the ranking.
    pub strict_scope: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            memory_types: Vec::new(),
            learner_id: None,
            topic: None,
            min_score: None,
            strict_scope: true,
        }
    }
}

impl RetrieveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_memory_type(mut self, kind: MemoryType) -> Self {
        if !self.memory_types.contains(&kind) {
            self.memory_types.push(kind);
        }
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

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Treat learner and topic as ranking hints instead of filters.
    pub fn ranking_only(mut self) -> Self {
        self.strict_scope = false;
        self
    }

    fn admits_scope(&self, bullet: &Bullet) -> bool {
        if !self.strict_scope {
            return true;
        }
        let learner_ok = self
            .learner_id
            .as_ref()
            .map_or(true, |l| bullet.learner_id.as_ref() == Some(l));
        let topic_ok = self
            .topic
            .as_ref()
            .map_or(true, |t| bullet.topic.as_ref() == Some(t));
        learner_ok && topic_ok
    }
}

impl AceMemory {
    /// Up to `top_k` bullets ranked for `query`, touching each one returned.
    pub fn retrieve(
        &mut self,
        query: &str,
        top_k: usize,
        options: &RetrieveOptions,
    ) -> Vec<Bullet> {
        let _span = MemorySpan::enter("retrieve", self.scope());
        let ranked = self.rank(query, options);
        let candidates = ranked.len();

        let chosen: Vec<String> = ranked.into_iter().take(top_k).map(|(_, id)| id).collect();
        for id in &chosen {
            self.touch(id);
        }
        let results: Vec<Bullet> = chosen
            .iter()
            .filter_map(|id| self.get(id).cloned())
            .collect();

        self.metrics.inc_retrievals();
        obs::emit_retrieval(candidates, results.len());
        results
    }

    /// [`Self::retrieve`] with the configured default `top_k`.
    pub fn retrieve_default(&mut self, query: &str, options: &RetrieveOptions) -> Vec<Bullet> {
        let top_k = self.config().retrieval.default_top_k;
        self.retrieve(query, top_k, options)
    }

    /// Every admitted bullet with its rank key, best first, ties by id.
    fn rank(&self, query: &str, options: &RetrieveOptions) -> Vec<(f64, String)> {
        let weights = &self.config().retrieval;
        let query_tokens = token_set(query);

        let candidate_ids: Vec<&String> = if options.tags.is_empty() {
            self.bullets.keys().collect()
        } else {
            options
                .tags
                .iter()
                .filter_map(|t| self.categories.get(&t.trim().to_lowercase()))
                .flatten()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let mut ranked: Vec<(f64, String)> = candidate_ids
            .into_iter()
            .filter_map(|id| self.bullets.get(id))
            .filter(|b| {
                options.memory_types.is_empty() || options.memory_types.contains(&b.memory_type)
            })
            .filter(|b| options.admits_scope(b))
            .filter_map(|b| {
                let score = self.score(b);
                if options.min_score.is_some_and(|min| score < min) {
                    return None;
                }

                let relevance = jaccard(&query_tokens, &token_set(&b.content));
                let mut key = weights.relevance_weight * relevance + weights.score_weight * score;
                if let Some(wanted) = &options.learner_id {
                    match &b.learner_id {
                        Some(owner) if owner == wanted => key += weights.learner_bonus,
                        Some(_) => key -= weights.foreign_learner_penalty,
                        None => {}
                    }
                }
                if options.topic.is_some() && b.topic == options.topic {
                    key += weights.topic_bonus;
                }
                key += weights.kind_weights.weight(b.memory_type);
                Some((key, b.id.clone()))
            })
            .collect();

        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        ranked
    }
}
