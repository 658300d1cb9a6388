use super::*;
use fleetd_adapters::session::FakeSessionAdapter;
use fleetd_core::{EvaluationRecommendation, PromptStyle, SystemClock};
use tempfile::tempdir;

fn sample_project(dir: &std::path::Path) -> Project {
    Project::new("demo", dir)
}

fn controller(
    sessions: FakeSessionAdapter,
) -> SessionController<FakeSessionAdapter, MemorySidecarStore, SystemClock> {
    SessionController::new(
        sessions,
        MemorySidecarStore::default(),
        SystemClock,
        SessionControllerConfig::default(),
    )
}

#[tokio::test]
async fn start_rejects_missing_directory() {
    let ctrl = controller(FakeSessionAdapter::new());
    let project = Project::new("demo", "/no/such/path/at/all");
    let outcome = ctrl.start(&project, "go".to_string(), None, 0, None).await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn start_rejects_when_at_concurrency_limit() {
    let dir = tempdir().unwrap();
    let ctrl = controller(FakeSessionAdapter::new());
    let project = sample_project(dir.path());
    let outcome = ctrl
        .start(&project, "go".to_string(), None, 5, None)
        .await;
    assert!(!outcome.success);
    assert!(outcome.message.contains("max concurrent"));
}

#[tokio::test]
async fn start_spawns_and_sends_prompt() {
    let dir = tempdir().unwrap();
    let sessions = FakeSessionAdapter::new();
    let project = sample_project(dir.path());
    let ctrl = controller(sessions.clone());

    let outcome = ctrl
        .start(&project, "start working".to_string(), Some("abc123".to_string()), 0, None)
        .await;
    assert!(outcome.success, "{}", outcome.message);

    let calls = sessions.calls();
    assert!(matches!(calls[0], fleetd_adapters::session::SessionCall::Spawn { .. }));
    assert!(calls
        .iter()
        .any(|c| matches!(c, fleetd_adapters::session::SessionCall::SendLiteral { text, .. } if text == "start working")));
    assert!(calls
        .iter()
        .any(|c| matches!(c, fleetd_adapters::session::SessionCall::SendEnter { .. })));
}

#[tokio::test]
async fn stop_sends_interrupt_then_kills_and_never_fails() {
    let sessions = FakeSessionAdapter::new();
    let ctrl = controller(sessions.clone());

    let outcome = ctrl.stop("never-started").await;
    assert!(outcome.success);
}

#[test]
fn resume_prompt_without_evaluation_is_generic() {
    let prompt = SessionController::<FakeSessionAdapter, MemorySidecarStore, SystemClock>::resume_prompt(None);
    assert!(prompt.contains("Resume work"));
}

#[test]
fn resume_prompt_summarizes_last_evaluation() {
    let eval = Evaluation {
        session_name: "orch-demo".to_string(),
        project: "demo".to_string(),
        started_at_ms: 0,
        stopped_at_ms: 60_000,
        files_changed: 2,
        lines_added: 10,
        lines_removed: 1,
        score: 3,
        recommendation: EvaluationRecommendation::Continue,
        prompt_style: PromptStyle::Implement,
        accomplishments: vec!["wired the router".to_string()],
        failures: vec!["tests still failing".to_string()],
        reasoning: "good progress but incomplete".to_string(),
    };
    let prompt = SessionController::<FakeSessionAdapter, MemorySidecarStore, SystemClock>::resume_prompt(Some(&eval));
    assert!(prompt.contains("3/5"));
    assert!(prompt.contains("wired the router"));
    assert!(prompt.contains("tests still failing"));
    assert!(prompt.contains("Resume work"));
}

#[test]
fn timed_out_projects_flags_only_overdue_sessions() {
    let ctrl = controller(FakeSessionAdapter::new());
    let limit = SessionControllerConfig::default().max_session_duration_ms;
    let now = limit + 1_000;

    let fresh = SessionRecord::new("fresh", "go", now - 1_000);
    let stale = SessionRecord::new("stale", "go", 0);

    let timed_out = ctrl.timed_out_projects(&[fresh, stale], now);
    assert_eq!(timed_out, vec!["stale".to_string()]);
}

#[tokio::test]
async fn memory_sidecar_store_roundtrips() {
    let store = MemorySidecarStore::default();
    assert!(store.load("demo").await.is_none());

    let record = SessionRecord::new("demo", "go", 0);
    store.save("demo", &record).await;
    assert_eq!(store.load("demo").await.unwrap().project, "demo");

    store.clear("demo").await;
    assert!(store.load("demo").await.is_none());
}
