use super::*;

fn sample() -> Evaluation {
    Evaluation {
        session_name: "orch-acme-api".into(),
        project: "acme-api".into(),
        started_at_ms: 0,
        stopped_at_ms: 90_000,
        files_changed: 0,
        lines_added: 0,
        lines_removed: 0,
        score: 2,
        recommendation: EvaluationRecommendation::Retry,
        prompt_style: PromptStyle::Resume,
        accomplishments: vec![],
        failures: vec!["no commits".into()],
        reasoning: "session idled".into(),
    }
}

#[test]
fn duration_minutes_converts_from_millis() {
    assert_eq!(sample().duration_minutes(), 1.5);
}

#[test]
fn detects_no_progress_sessions() {
    assert!(sample().made_no_progress());
    let mut progressed = sample();
    progressed.files_changed = 2;
    assert!(!progressed.made_no_progress());
}

#[test]
fn score_is_clamped_to_one_through_five() {
    let mut eval = sample();
    eval.score = 9;
    assert_eq!(eval.score_clamped(), 5);
}

#[test]
fn recommendation_parses_from_str() {
    assert_eq!(
        "Escalate".parse::<EvaluationRecommendation>().unwrap(),
        EvaluationRecommendation::Escalate
    );
    assert!("bogus".parse::<EvaluationRecommendation>().is_err());
}
