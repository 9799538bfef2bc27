//! Trait contract tests for MemoryStorage.
//!
//! These tests verify the behavioral contract of the storage trait against every
//! backend in this crate. Any conforming implementation must pass them.

use ace_memory_state::fakes::{InMemoryStorage, UnavailableStorage};
use ace_memory_state::{BulletRecord, JsonFileStorage, MemoryStorage, Snapshot, StorageError};

fn sample_snapshot(clock: u64) -> Snapshot {
    let mut a = BulletRecord::new("a1", "Convert fractions to decimals before comparing");
    a.memory_type = Some("procedural".to_string());
    a.helpful_count = 2;
    a.procedural_strength = 2.0;
    a.procedural_access_index = clock;
    a.tags = vec!["procedural".to_string(), "fractions".to_string()];

    let mut b = BulletRecord::new("b2", "Learner mixes up numerator and denominator");
    b.memory_type = Some("episodic".to_string());
    b.episodic_strength = 1.0;
    b.learner_id = Some("learner-7".to_string());

    Snapshot::new(vec![a, b], clock)
}

fn assert_empty_load(storage: &dyn MemoryStorage) {
    assert!(storage.load().unwrap().is_none());
}

fn assert_round_trip(storage: &dyn MemoryStorage) {
    let snap = sample_snapshot(12);
    storage.save(&snap).unwrap();
    assert_eq!(storage.load().unwrap(), Some(snap));
}

fn assert_last_save_wins(storage: &dyn MemoryStorage) {
    storage.save(&sample_snapshot(1)).unwrap();
    let newer = sample_snapshot(2);
    storage.save(&newer).unwrap();
    assert_eq!(storage.load().unwrap().unwrap().access_clock, 2);
}

// ===========================================================================
// InMemoryStorage
// ===========================================================================

#[test]
fn in_memory_load_empty() {
    assert_empty_load(&InMemoryStorage::new());
}

#[test]
fn in_memory_round_trip() {
    assert_round_trip(&InMemoryStorage::new());
}

#[test]
fn in_memory_last_save_wins() {
    let storage = InMemoryStorage::new();
    assert_last_save_wins(&storage);
    assert_eq!(storage.save_count(), 2);
}

#[test]
fn in_memory_preseeded_snapshot_loads() {
    let storage = InMemoryStorage::with_snapshot(sample_snapshot(5));
    assert_eq!(storage.load().unwrap().unwrap().bullets.len(), 2);
    assert_eq!(storage.save_count(), 0);
}

// ===========================================================================
// JsonFileStorage
// ===========================================================================

#[test]
fn file_load_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert_empty_load(&JsonFileStorage::new(dir.path().join("m.json")));
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    assert_round_trip(&JsonFileStorage::new(dir.path().join("m.json")));
}

#[test]
fn file_last_save_wins() {
    let dir = tempfile::tempdir().unwrap();
    assert_last_save_wins(&JsonFileStorage::new(dir.path().join("m.json")));
}

#[test]
fn file_storage_usable_as_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Box<dyn MemoryStorage> =
        Box::new(JsonFileStorage::for_learner(dir.path(), "learner-7").unwrap());
    assert!(storage.describe().starts_with("file:"));
    assert_round_trip(storage.as_ref());
}

// ===========================================================================
// UnavailableStorage
// ===========================================================================

#[test]
fn unavailable_fails_every_call() {
    let storage = UnavailableStorage::new();
    assert!(matches!(storage.load(), Err(StorageError::Backend(_))));
    assert!(matches!(
        storage.save(&Snapshot::empty()),
        Err(StorageError::Backend(_))
    ));
    assert_eq!(storage.attempts(), 2);
}
