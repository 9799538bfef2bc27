//! Observability tests: structured `memory.*` events and per-store metrics.

use std::io;
use std::sync::{Arc, Mutex};

use ace_memory_core::obs::{emit_bullet_evicted, emit_persist_failed, MemorySpan};
use ace_memory_core::{AceMemory, BulletDraft, DeltaUpdate, MemoryConfig, RetrieveOptions};
use ace_memory_state::fakes::UnavailableStorage;
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer the fmt layer writes into.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn captured<F: FnOnce()>(f: F) -> String {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = capture.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_eviction_event_carries_score() {
    let logs = captured(|| emit_bullet_evicted("abc123", 0.25));
    assert!(logs.contains("memory.bullet_evicted"));
    assert!(logs.contains("abc123"));
    assert!(logs.contains("0.25"));
}

#[test]
fn test_span_wraps_events() {
    let logs = captured(|| {
        let _span = MemorySpan::enter("apply_delta", "in-memory");
        emit_persist_failed("in-memory", &"disk full");
    });
    assert!(logs.contains("ace.memory"));
    assert!(logs.contains("apply_delta"));
    assert!(logs.contains("memory.persist_failed"));
    assert!(logs.contains("disk full"));
}

#[test]
fn test_store_operations_emit_lifecycle_events() {
    let logs = captured(|| {
        let mut m = AceMemory::in_memory(MemoryConfig::default()).unwrap();
        m.apply_delta(
            DeltaUpdate::new()
                .add(BulletDraft::new("Check the units"))
                .add(BulletDraft::new("Check  the units"))
                .add(BulletDraft::new("")),
        );
        m.retrieve("units", 3, &RetrieveOptions::new());
    });
    for event in [
        "memory.delta_applied",
        "memory.duplicate_dropped",
        "memory.invalid_skipped",
        "memory.retrieval",
    ] {
        assert!(logs.contains(event), "missing {event} in:\n{logs}");
    }
}

#[test]
fn test_failed_load_and_save_are_logged_and_counted() {
    let mut store = None;
    let logs = captured(|| {
        let mut m =
            AceMemory::open(MemoryConfig::default(), Arc::new(UnavailableStorage::new())).unwrap();
        m.apply_delta(DeltaUpdate::new().add(BulletDraft::new("Keep going")));
        store = Some(m);
    });
    assert!(logs.contains("memory.load_failed"));
    assert!(logs.contains("memory.persist_failed"));

    let m = store.unwrap();
    assert_eq!(m.metrics().persist_failures(), 1);
    assert_eq!(m.metrics().bullets_added(), 1);
    assert_eq!(m.metrics().deltas_applied(), 1);
    m.metrics().flush();
    m.metrics().reset();
    assert_eq!(m.metrics().persist_failures(), 0);
}
