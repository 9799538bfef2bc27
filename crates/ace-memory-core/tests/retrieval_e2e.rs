//! End-to-end tests for retrieval ranking, recency reinforcement and rendering.

use ace_memory_core::{
    AceMemory, BulletDraft, DeltaUpdate, MemoryConfig, MemoryType, RetrieveOptions, CONTEXT_HEADER,
};

fn seeded() -> AceMemory {
    let mut m = AceMemory::in_memory(MemoryConfig::default()).unwrap();
    m.apply_delta(
        DeltaUpdate::new()
            .add(
                BulletDraft::new("multiply numbers with calculator")
                    .with_id("proc")
                    .with_memory_type(MemoryType::Procedural),
            )
            .add(
                BulletDraft::new("multiply numbers means scaling")
                    .with_id("sem")
                    .with_memory_type(MemoryType::Semantic),
            ),
    );
    m
}

#[test]
fn test_procedural_wins_on_kind_weight() {
    let mut m = seeded();
    let got = m.retrieve("multiply numbers", 1, &RetrieveOptions::new());
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].id, "proc");
}

#[test]
fn test_memory_type_filter() {
    let mut m = seeded();
    let opts = RetrieveOptions::new().with_memory_type(MemoryType::Semantic);
    let got = m.retrieve("multiply numbers", 5, &opts);
    assert_eq!(got.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["sem"]);
}

#[test]
fn test_recent_touch_scores_at_least_as_high() {
    let mut m = AceMemory::in_memory(MemoryConfig::default().with_dedup_threshold(1.0)).unwrap();
    m.apply_delta(
        DeltaUpdate::new()
            .add(
                BulletDraft::new("Round to the nearest ten")
                    .with_id("used")
                    .with_memory_type(MemoryType::Semantic),
            )
            .add(
                BulletDraft::new("Round to the nearest hundred")
                    .with_id("idle")
                    .with_memory_type(MemoryType::Semantic),
            ),
    );

    for _ in 0..5 {
        let got = m.retrieve("nearest ten", 1, &RetrieveOptions::new());
        assert_eq!(got[0].id, "used");
    }
    let used = m.score_of("used").unwrap();
    let idle = m.score_of("idle").unwrap();
    assert!(used >= idle, "used {used} < idle {idle}");
    assert_eq!(m.get("used").unwrap().active().access_index, m.access_clock());
}

#[test]
fn test_retrieve_default_uses_configured_top_k() {
    let mut config = MemoryConfig::default();
    config.retrieval.default_top_k = 1;
    let mut m = AceMemory::in_memory(config).unwrap();
    m.apply_delta(
        DeltaUpdate::new()
            .add(BulletDraft::new("Estimate the answer"))
            .add(BulletDraft::new("Double check the arithmetic")),
    );
    assert_eq!(m.retrieve_default("answer", &RetrieveOptions::new()).len(), 1);
}

#[test]
fn test_render_context_for_prompt() {
    let mut m = seeded();
    let text = m.render_context("multiply numbers", 2, &RetrieveOptions::new());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], CONTEXT_HEADER);
    assert_eq!(lines[1], "1. [+0/-0] multiply numbers with calculator");
    assert_eq!(lines[2], "2. [+0/-0] multiply numbers means scaling");
    assert!(lines[3].chars().all(|c| c == '='));
}

#[test]
fn test_statistics_after_retrieval() {
    let mut m = seeded();
    let before = m.statistics().avg_score;
    m.retrieve("multiply numbers", 2, &RetrieveOptions::new());
    let stats = m.statistics();
    assert_eq!(stats.total_bullets, 2);
    assert!(stats.avg_score >= before);
    assert_eq!(stats.categories["procedural"], 1);
    assert_eq!(stats.categories["semantic"], 1);
}
