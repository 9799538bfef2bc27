//! Snapshot schema for persisted ACE memory
//!
//! A snapshot is the full state of one store: every bullet plus the logical
//! access clock. Records written by older releases (version "1.0") lack the
//! memory-kind fields and use naive ISO timestamps; every field added since
//! then is defaulted so those files still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version written by this release.
pub const SNAPSHOT_VERSION: &str = "2.0";

/// Version of snapshots that predate memory kinds and the access clock.
pub const LEGACY_SNAPSHOT_VERSION: &str = "1.0";

/// Timestamps are written as RFC 3339; values without an offset are read as UTC.
mod lenient_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

mod lenient_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_some(&d.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::lenient_datetime::parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}

fn default_version() -> String {
    LEGACY_SNAPSHOT_VERSION.to_string()
}

/// Serialized form of a single bullet. Every engine-side field is stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletRecord {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub helpful_count: u32,
    #[serde(default)]
    pub harmful_count: u32,
    #[serde(with = "lenient_datetime", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "lenient_datetime_opt", default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Kind label (`semantic` | `episodic` | `procedural`); absent in legacy records.
    #[serde(default)]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub semantic_strength: f64,
    #[serde(default)]
    pub episodic_strength: f64,
    #[serde(default)]
    pub procedural_strength: f64,
    #[serde(default)]
    pub semantic_access_index: u64,
    #[serde(default)]
    pub episodic_access_index: u64,
    #[serde(default)]
    pub procedural_access_index: u64,
    #[serde(default)]
    pub learner_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
}

impl BulletRecord {
    /// Minimal record carrying only identity and content; everything else defaulted.
    pub fn new(id: &str, content: &str) -> Self {
        BulletRecord {
            id: id.to_string(),
            content: content.to_string(),
            helpful_count: 0,
            harmful_count: 0,
            created_at: Utc::now(),
            last_used: None,
            tags: Vec::new(),
            memory_type: None,
            semantic_strength: 0.0,
            episodic_strength: 0.0,
            procedural_strength: 0.0,
            semantic_access_index: 0,
            episodic_access_index: 0,
            procedural_access_index: 0,
            learner_id: None,
            topic: None,
            concept: None,
            content_hash: None,
        }
    }
}

/// Full persisted state of one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub bullets: Vec<BulletRecord>,
    #[serde(default)]
    pub access_clock: u64,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(with = "lenient_datetime_opt", default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Snapshot stamped with the current version and time.
    pub fn new(bullets: Vec<BulletRecord>, access_clock: u64) -> Self {
        Snapshot {
            bullets,
            access_clock,
            version: SNAPSHOT_VERSION.to_string(),
            last_updated: Some(Utc::now()),
        }
    }

    /// Snapshot with no bullets and a zeroed clock.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn is_legacy(&self) -> bool {
        self.version == LEGACY_SNAPSHOT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_legacy_snapshot() {
        let raw = r#"{
            "bullets": [
                {
                    "id": "a1b2c3d4e5f6",
                    "content": "Break word problems into steps",
                    "helpful_count": 3,
                    "harmful_count": 1,
                    "created_at": "2025-03-01T10:15:30.123456",
                    "last_used": null,
                    "tags": ["math"]
                }
            ],
            "version": "1.0",
            "last_updated": "2025-03-02T08:00:00"
        }"#;
        let snap: Snapshot = serde_json::from_str(raw).unwrap();
        assert!(snap.is_legacy());
        assert_eq!(snap.access_clock, 0);
        assert_eq!(snap.bullets.len(), 1);

        let rec = &snap.bullets[0];
        assert_eq!(rec.helpful_count, 3);
        assert_eq!(rec.memory_type, None);
        assert_eq!(rec.procedural_strength, 0.0);
        assert_eq!(rec.content_hash, None);
        assert_eq!(rec.created_at.to_rfc3339(), "2025-03-01T10:15:30.123456+00:00");
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let snap: Snapshot = serde_json::from_str(r#"{"bullets": []}"#).unwrap();
        assert!(snap.is_legacy());
        assert!(snap.last_updated.is_none());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let raw = r#"{"bullets": [{"content": "x", "created_at": "yesterday"}]}"#;
        assert!(serde_json::from_str::<Snapshot>(raw).is_err());
    }

    #[test]
    fn test_new_snapshot_is_current_version() {
        let mut rec = BulletRecord::new("abc", "Check units before answering");
        rec.memory_type = Some("semantic".into());
        rec.semantic_strength = 2.0;
        rec.semantic_access_index = 7;
        let snap = Snapshot::new(vec![rec.clone()], 7);
        assert_eq!(snap.version, SNAPSHOT_VERSION);

        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bullets[0], rec);
        assert_eq!(back.access_clock, 7);
    }
}
