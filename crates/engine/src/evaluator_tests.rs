use super::*;
use fleetd_adapters::session::FakeSessionAdapter;
use fleetd_adapters::vcs::{DiffStat, FakeVcsAdapter};
use parking_lot::Mutex;
use std::path::PathBuf;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, NotificationTier, String)>>,
}

#[async_trait::async_trait]
impl EvaluationNotifier for RecordingNotifier {
    async fn notify(&self, project: &str, tier: NotificationTier, text: String) {
        self.sent.lock().push((project.to_string(), tier, text));
    }
}

fn oracle_response(score: u8, reasoning: &str) -> OracleOutcome {
    OracleOutcome::Decoded(serde_json::json!({
        "score": score,
        "reasoning": reasoning,
        "accomplishments": ["did a thing"],
        "failures": [],
        "recommendation": "continue",
    }))
}

#[tokio::test]
async fn evaluates_and_persists_and_notifies_low_score() {
    let dir = PathBuf::from(".");
    let sessions = FakeSessionAdapter::new();
    sessions.add_session(SessionName::for_project("demo").as_str(), true);
    let vcs = FakeVcsAdapter::new();
    vcs.set_diff_stat(
        &dir,
        DiffStat {
            files_changed: 3,
            insertions: 10,
            deletions: 2,
        },
    );
    vcs.set_log(&dir, vec!["abc fix bug".to_string()]);
    let notifier = RecordingNotifier::default();
    let db = Database::connect_in_memory().await.unwrap();

    let evaluator = SessionEvaluator::new(sessions, vcs, notifier, db);
    let record = SessionRecord::new("demo", "fix the failing test", 0);

    let eval = evaluator
        .evaluate(&record, &dir, &oracle_response(1, "barely started, tests still fail"), 5_000)
        .await
        .unwrap();

    assert_eq!(eval.score, 1);
    assert_eq!(eval.files_changed, 3);
    assert_eq!(eval.prompt_style, PromptStyle::Fix);
    assert_eq!(evaluator.notifier.sent.lock().len(), 1);
}

#[tokio::test]
async fn rejects_double_evaluation_of_same_or_older_session() {
    let dir = PathBuf::from(".");
    let sessions = FakeSessionAdapter::new();
    sessions.add_session(SessionName::for_project("demo").as_str(), true);
    let vcs = FakeVcsAdapter::new();
    let notifier = RecordingNotifier::default();
    let db = Database::connect_in_memory().await.unwrap();

    let evaluator = SessionEvaluator::new(sessions, vcs, notifier, db);
    let record = SessionRecord::new("demo", "implement the feature", 10_000);

    evaluator
        .evaluate(&record, &dir, &oracle_response(4, "solid progress"), 20_000)
        .await
        .unwrap();

    let outcome = evaluator.evaluate(&record, &dir, &oracle_response(4, "again"), 30_000).await;
    assert!(matches!(outcome, Err(EvaluateError::AlreadyEvaluated)));
}

#[test]
fn classifies_prompt_style_by_fixed_keywords() {
    assert_eq!(classify_prompt_style("fix the crash"), PromptStyle::Fix);
    assert_eq!(classify_prompt_style("implement login"), PromptStyle::Implement);
    assert_eq!(classify_prompt_style("explore the codebase"), PromptStyle::Explore);
    assert_eq!(classify_prompt_style("resume where you left off"), PromptStyle::Resume);
    assert_eq!(classify_prompt_style("write documentation"), PromptStyle::Custom);
}

#[test]
fn pattern_summary_reports_insufficient_data_below_threshold() {
    let summary = SessionEvaluator::<FakeSessionAdapter, FakeVcsAdapter, RecordingNotifier>::pattern_summary(
        12,
        &[],
    );
    assert_eq!(summary, "insufficient data (12/50)");
}

#[test]
fn pattern_summary_averages_once_threshold_met() {
    let summary = SessionEvaluator::<FakeSessionAdapter, FakeVcsAdapter, RecordingNotifier>::pattern_summary(
        50,
        &[("continue".to_string(), 4), ("continue".to_string(), 2)],
    );
    assert!(summary.contains("3.0/5"));
}
