//! Engine configuration: refine bounds, per-kind decay, retrieval weights.
//!
//! Every field has a default, so a TOML file only needs the keys it changes.
//! Environment overrides are applied on top with [`MemoryConfig::with_env_overrides`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MemoryError, MemoryResult};
use crate::kind::MemoryType;

pub const ENV_MAX_BULLETS: &str = "ACE_MEMORY_MAX_BULLETS";
pub const ENV_DEDUP_THRESHOLD: &str = "ACE_MEMORY_DEDUP_THRESHOLD";
pub const ENV_DECAY_SEMANTIC: &str = "ACE_MEMORY_DECAY_SEMANTIC";
pub const ENV_DECAY_EPISODIC: &str = "ACE_MEMORY_DECAY_EPISODIC";
pub const ENV_DECAY_PROCEDURAL: &str = "ACE_MEMORY_DECAY_PROCEDURAL";

/// Per-kind decay rate in `[0, 1]`, applied once per elapsed access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    pub semantic: f64,
    pub episodic: f64,
    pub procedural: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            semantic: 0.01,
            episodic: 0.05,
            procedural: 0.002,
        }
    }
}

impl DecayRates {
    pub fn rate(&self, kind: MemoryType) -> f64 {
        match kind {
            MemoryType::Semantic => self.semantic,
            MemoryType::Episodic => self.episodic,
            MemoryType::Procedural => self.procedural,
        }
    }
}

/// Fixed ranking bonus per memory kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub semantic: f64,
    pub episodic: f64,
    pub procedural: f64,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            semantic: 0.05,
            episodic: 0.10,
            procedural: 0.15,
        }
    }
}

impl KindWeights {
    pub fn weight(&self, kind: MemoryType) -> f64 {
        match kind {
            MemoryType::Semantic => self.semantic,
            MemoryType::Episodic => self.episodic,
            MemoryType::Procedural => self.procedural,
        }
    }
}

/// Weights of the retrieval rank key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalWeights {
    pub relevance_weight: f64,
    pub score_weight: f64,
    pub learner_bonus: f64,
    pub foreign_learner_penalty: f64,
    pub topic_bonus: f64,
    pub kind_weights: KindWeights,
    pub default_top_k: usize,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            relevance_weight: 0.6,
            score_weight: 0.4,
            learner_bonus: 0.6,
            foreign_learner_penalty: 0.1,
            topic_bonus: 0.3,
            kind_weights: KindWeights::default(),
            default_top_k: 10,
        }
    }
}

/// Configuration for one memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Upper bound on live bullets after every refine.
    pub max_bullets: usize,
    /// Jaccard similarity above which two bullets are merged.
    pub dedup_threshold: f64,
    pub decay_rates: DecayRates,
    pub retrieval: RetrievalWeights,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_bullets: 100,
            dedup_threshold: 0.85,
            decay_rates: DecayRates::default(),
            retrieval: RetrievalWeights::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> MemoryResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| MemoryError::InvalidConfig(format!("{key}={raw:?} is not a valid value")))
}

impl MemoryConfig {
    /// Parse TOML text; missing keys fall back to defaults.
    pub fn from_toml_str(text: &str) -> MemoryResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply `ACE_MEMORY_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> MemoryResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup` (the environment in production).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> MemoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_BULLETS) {
            self.max_bullets = parse_env(ENV_MAX_BULLETS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DEDUP_THRESHOLD) {
            self.dedup_threshold = parse_env(ENV_DEDUP_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DECAY_SEMANTIC) {
            self.decay_rates.semantic = parse_env(ENV_DECAY_SEMANTIC, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DECAY_EPISODIC) {
            self.decay_rates.episodic = parse_env(ENV_DECAY_EPISODIC, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DECAY_PROCEDURAL) {
            self.decay_rates.procedural = parse_env(ENV_DECAY_PROCEDURAL, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_max_bullets(mut self, max_bullets: usize) -> Self {
        self.max_bullets = max_bullets;
        self
    }

    pub fn with_dedup_threshold(mut self, threshold: f64) -> Self {
        self.dedup_threshold = threshold;
        self
    }

    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> MemoryResult<()> {
        if self.max_bullets == 0 {
            return Err(MemoryError::InvalidConfig(
                "max_bullets must be at least 1".to_string(),
            ));
        }
        let unit = |name: &str, v: f64| -> MemoryResult<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(MemoryError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            }
        };
        unit("dedup_threshold", self.dedup_threshold)?;
        unit("decay_rates.semantic", self.decay_rates.semantic)?;
        unit("decay_rates.episodic", self.decay_rates.episodic)?;
        unit("decay_rates.procedural", self.decay_rates.procedural)?;

        let r = &self.retrieval;
        let weights = [
            ("retrieval.relevance_weight", r.relevance_weight),
            ("retrieval.score_weight", r.score_weight),
            ("retrieval.learner_bonus", r.learner_bonus),
            ("retrieval.foreign_learner_penalty", r.foreign_learner_penalty),
            ("retrieval.topic_bonus", r.topic_bonus),
            ("retrieval.kind_weights.semantic", r.kind_weights.semantic),
            ("retrieval.kind_weights.episodic", r.kind_weights.episodic),
            ("retrieval.kind_weights.procedural", r.kind_weights.procedural),
        ];
        for (name, v) in weights {
            if !v.is_finite() || v < 0.0 {
                return Err(MemoryError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }
}
