//! End-to-end engine tests: navigation, domain lifecycle, and context
//! assembly working together over an in-memory backend.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::too_many_lines)]

use serde_json::json;
use zptmem::{
    ContextAssembler, ContextBudget, DomainStatus, DomainType, EngineConfig, FadeOptions,
    InMemoryBackend, Interaction, NO_CONTEXT_ANSWER, NavigationState, RawBudget, RawItem,
    SourceSelection, Tilt, Zoom, estimate_tokens,
};

fn budget() -> ContextBudget {
    ContextBudget {
        max_tokens: 2000,
        max_context_size: 10,
        truncation_limit: 300,
        recent_interactions_count: 3,
        recent_interactions_truncation_limit: 80,
    }
}

fn item(value: serde_json::Value) -> RawItem {
    serde_json::from_value(value).unwrap()
}

fn seeded_assembler(items: Vec<serde_json::Value>) -> ContextAssembler<InMemoryBackend> {
    let backend =
        InMemoryBackend::with_items(items.into_iter().map(item).collect());
    let config = EngineConfig::from_budget(budget());
    let assembler = ContextAssembler::new(&config, backend, "session-1");
    for id in ["climate", "oceans"] {
        assembler
            .domains()
            .create_domain(DomainType::Project, id, None, &[])
            .unwrap();
    }
    assembler
}

#[tokio::test]
async fn test_ask_combines_recent_and_local_memory() {
    let assembler = seeded_assembler(vec![
        json!({
            "content": "Ocean currents redistribute heat toward the poles",
            "label": "heat transport",
            "domain": "oceans",
            "relevance": 0.92,
            "keywords": ["ocean", "heat"]
        }),
        json!({
            "content": "Arctic ice extent has declined since 1979",
            "label": "ice decline",
            "domain": "climate",
            "relevance": 0.85
        }),
    ]);
    assembler
        .navigation()
        .add_to_session_cache(Interaction::new(
            "i1",
            "what did we discuss?",
            "We compared reanalysis datasets.",
        ))
        .unwrap();

    let assembly = assembler
        .assemble("how does the ocean move heat?", &SourceSelection::all())
        .await
        .unwrap();

    assert!(assembly.success);
    assert!(assembly.sources.recent);
    assert!(assembly.sources.local);
    assert!(!assembly.sources.external);
    let prompt = assembly.prompt.unwrap();
    assert!(prompt.contains("## Recent Session"));
    assert!(prompt.contains("We compared reanalysis datasets."));
    assert!(prompt.contains("## Local Memory"));
    assert!(prompt.contains("heat transport"));
    assert!(prompt.contains("Question: how does the ocean move heat?"));
    assert!(estimate_tokens(&prompt) <= 2000);
}

#[tokio::test]
async fn test_pan_restricts_assembly_to_selected_domains() {
    let assembler = seeded_assembler(vec![
        json!({"content": "ocean fact", "domain": "oceans", "relevance": 0.9}),
        json!({"content": "climate fact", "domain": "climate", "relevance": 0.9}),
    ]);
    let pan = zptmem::Pan {
        domains: ["oceans".to_string()].into_iter().collect(),
        temporal: None,
    };
    assembler.navigation().set_pan(pan).unwrap();

    let assembly = assembler
        .assemble("q", &SourceSelection::local_only())
        .await
        .unwrap();
    let prompt = assembly.prompt.unwrap();
    assert!(prompt.contains("ocean fact"));
    assert!(!prompt.contains("climate fact"));
}

#[tokio::test]
async fn test_faded_out_domain_disappears_from_assembly() {
    let assembler = seeded_assembler(vec![
        json!({"content": "ocean fact", "domain": "oceans", "relevance": 0.9}),
        json!({"content": "climate fact", "domain": "climate", "relevance": 0.9}),
    ]);
    assembler
        .domains()
        .fade_context("climate", 1.0, &FadeOptions::default())
        .await
        .unwrap();
    assert_eq!(
        assembler.domains().get_domain("climate").unwrap().unwrap().status,
        DomainStatus::Archived
    );

    let assembly = assembler
        .assemble("q", &SourceSelection::local_only())
        .await
        .unwrap();
    let prompt = assembly.prompt.unwrap();
    assert!(prompt.contains("ocean fact"));
    assert!(!prompt.contains("climate fact"));
}

#[tokio::test]
async fn test_switch_domains_fades_old_and_creates_new() {
    let assembler = seeded_assembler(vec![]);
    let old = ["climate".to_string()].into_iter().collect();
    let new = ["volcanoes".to_string(), "oceans".to_string()]
        .into_iter()
        .collect();
    let active = assembler
        .domains()
        .switch_domains(&old, &new, Some(0.5))
        .await
        .unwrap();

    assert!(active.contains("volcanoes"));
    assert!(active.contains("oceans"));
    let faded = assembler.domains().get_domain("climate").unwrap().unwrap();
    assert!((faded.importance - 0.5).abs() < 1e-6);
    let created = assembler.domains().get_domain("volcanoes").unwrap().unwrap();
    assert_eq!(created.domain_type, DomainType::Project);
    assert_eq!(created.status, DomainStatus::Active);
    // Carried over unchanged.
    let kept = assembler.domains().get_domain("oceans").unwrap().unwrap();
    assert!((kept.importance - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_zoom_tilt_history_survives_assembly() {
    let assembler = seeded_assembler(vec![]);
    assembler
        .navigation()
        .set_zoom(Zoom::Concept, Some("broaden"))
        .unwrap();
    assembler
        .navigation()
        .set_tilt(Tilt::Temporal, None)
        .unwrap();
    assembler
        .assemble("anything", &SourceSelection::all())
        .await
        .unwrap();

    let state = assembler.navigation().state().unwrap();
    assert_eq!(state.zoom, Zoom::Concept);
    assert_eq!(state.tilt, Tilt::Temporal);
    assert_eq!(state.focus_query, "anything");
    // The last snapshot is the pre-tilt state: zoom already moved,
    // tilt still at its default.
    assert_eq!(assembler.navigation().previous_zoom().unwrap(), Some(Zoom::Concept));
    assert_eq!(
        assembler.navigation().previous_tilt().unwrap(),
        Some(Tilt::Keywords)
    );
}

#[tokio::test]
async fn test_empty_engine_returns_sentinel() {
    let assembler = seeded_assembler(vec![]);
    let assembly = assembler
        .assemble("is anything stored?", &SourceSelection::all())
        .await
        .unwrap();
    assert!(assembly.success);
    assert_eq!(assembly.answer.as_deref(), Some(NO_CONTEXT_ANSWER));
    assert!(assembly.prompt.is_none());
}

#[tokio::test]
async fn test_invalid_budget_reports_missing_key() {
    let assembler = seeded_assembler(vec![]);
    let raw = RawBudget {
        max_tokens: Some(1000),
        max_context_size: Some(5),
        truncation_limit: None,
        recent_interactions_count: Some(2),
        recent_interactions_truncation_limit: Some(50),
    };
    let err = assembler
        .assemble_with_budget("q", &raw, &SourceSelection::all())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("context.truncation_limit"));
}

#[tokio::test]
async fn test_relevance_threshold_applies_end_to_end() {
    let assembler = seeded_assembler(vec![
        json!({"content": "weak match", "domain": "oceans", "relevance": 0.1}),
        json!({"content": "strong match", "domain": "oceans", "relevance": 0.9}),
    ]);
    let assembly = assembler
        .assemble("q", &SourceSelection::local_only())
        .await
        .unwrap();
    let prompt = assembly.prompt.unwrap();
    assert!(prompt.contains("strong match"));
    assert!(!prompt.contains("weak match"));
}

#[test]
fn test_navigation_state_defaults() {
    let state = NavigationState::new("s");
    assert_eq!(state.zoom, Zoom::Entity);
    assert_eq!(state.tilt, Tilt::Keywords);
    assert!(state.pan.domains.is_empty());
    assert!((state.relevance_threshold - 0.3).abs() < 1e-6);
    assert_eq!(state.max_memories, 10);
}
