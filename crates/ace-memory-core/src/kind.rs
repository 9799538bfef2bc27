//! Memory kinds and the keyword fallback classifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MemoryError;

/// What kind of memory a bullet holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Durable domain fact.
    Semantic,
    /// Situational or learner-specific observation.
    Episodic,
    /// Actionable step or strategy.
    Procedural,
}

const PROCEDURAL_CUES: &[&str] = &[
    "step", "steps", "next", "then", "first", "convert", "apply", "use", "try",
    "calculate", "compute", "check", "verify", "break", "rewrite", "substitute", "solve",
    "strategy", "method", "procedure",
];

const EPISODIC_CUES: &[&str] = &[
    "user", "learner", "student", "prefers", "preference", "preferred", "likes", "dislikes",
    "mistake", "mistakes", "confused", "confuses", "struggled", "struggles", "forgot",
    "asked", "session", "yesterday", "today",
];

impl MemoryType {
    pub const ALL: [MemoryType; 3] = [
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
    ];

    /// Tag label for this kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Episodic => "episodic",
            Self::Procedural => "procedural",
        }
    }

    /// Parse a tag label case-insensitively; `None` for non-kind labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "semantic" => Some(Self::Semantic),
            "episodic" => Some(Self::Episodic),
            "procedural" => Some(Self::Procedural),
            _ => None,
        }
    }

    /// Fallback classifier for bullets that arrive without a kind.
    ///
    /// A kind label among `tags` wins. Otherwise procedural cues are checked
    /// before episodic ones, and anything else is semantic.
    pub fn infer(content: &str, tags: &[String]) -> Self {
        if let Some(kind) = tags.iter().find_map(|t| Self::from_label(t)) {
            return kind;
        }

        let words: Vec<String> = content
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has_any = |cues: &[&str]| words.iter().any(|w| cues.contains(&w.as_str()));

        if has_any(PROCEDURAL_CUES) {
            Self::Procedural
        } else if has_any(EPISODIC_CUES) {
            Self::Episodic
        } else {
            Self::Semantic
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MemoryType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
            .ok_or_else(|| MemoryError::InvalidBullet(format!("unknown memory type: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_label_roundtrip() {
        for kind in MemoryType::ALL {
            assert_eq!(MemoryType::from_label(kind.label()), Some(kind));
            assert_eq!(kind.to_string().parse::<MemoryType>().unwrap(), kind);
        }
        assert_eq!(MemoryType::from_label(" Procedural "), Some(MemoryType::Procedural));
        assert!("habit".parse::<MemoryType>().is_err());
    }

    #[test]
    fn test_tag_label_wins() {
        let kind = MemoryType::infer("Convert units first", &tags(&["math", "Semantic"]));
        assert_eq!(kind, MemoryType::Semantic);
    }

    #[test]
    fn test_procedural_cues() {
        assert_eq!(
            MemoryType::infer("Convert mixed numbers, then add", &[]),
            MemoryType::Procedural
        );
        assert_eq!(
            MemoryType::infer("Use calculator for multiplication", &[]),
            MemoryType::Procedural
        );
    }

    #[test]
    fn test_episodic_cues() {
        assert_eq!(
            MemoryType::infer("The learner prefers visual examples", &[]),
            MemoryType::Episodic
        );
        assert_eq!(
            MemoryType::infer("Common mistake: sign errors.", &[]),
            MemoryType::Episodic
        );
    }

    #[test]
    fn test_procedural_beats_episodic() {
        assert_eq!(
            MemoryType::infer("When the student is stuck, break the problem into steps", &[]),
            MemoryType::Procedural
        );
    }

    #[test]
    fn test_default_semantic() {
        assert_eq!(
            MemoryType::infer("A prime number has exactly two divisors", &[]),
            MemoryType::Semantic
        );
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&MemoryType::Episodic).unwrap();
        assert_eq!(json, "\"episodic\"");
    }
}
