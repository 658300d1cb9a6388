use super::*;

fn sample_recommendation() -> Recommendation {
    Recommendation {
        project: "acme-api".into(),
        action: ActionKind::Start,
        reason: "idle session detected".into(),
        priority: 9,
        prompt: None,
        confidence: Some(0.8),
        notification_tier: None,
    }
}

#[test]
fn priority_is_clamped_to_one_through_five() {
    let rec = sample_recommendation();
    assert_eq!(rec.priority_clamped(), 5);
}

#[test]
fn default_priority_is_three_when_absent() {
    let json = r#"{"project":"acme-api","action":"notify","reason":"because"}"#;
    let rec: Recommendation = serde_json::from_str(json).unwrap();
    assert_eq!(rec.priority, 3);
}

#[test]
fn accepted_decision_has_no_rejection_reason() {
    let decision = Decision::accepted(sample_recommendation(), false, 1_000);
    assert!(decision.validated);
    assert!(decision.rejection_reason.is_none());
}

#[test]
fn rejected_decision_carries_a_reason() {
    let decision = Decision::rejected(sample_recommendation(), "breaker open", 1_000);
    assert!(!decision.validated);
    assert_eq!(decision.rejection_reason.as_deref(), Some("breaker open"));
}
