use super::*;

#[test]
fn average_score_is_none_with_no_sessions() {
    let summary = TrustSummary::default();
    assert_eq!(summary.average_score(), None);
}

#[test]
fn average_score_divides_sum_by_count() {
    let mut summary = TrustSummary::default();
    summary.record_session(4);
    summary.record_session(2);
    assert_eq!(summary.average_score(), Some(3.0));
}

#[test]
fn ledger_entries_are_independent_per_level() {
    let mut ledger = TrustLedger::default();
    ledger.entry(AutonomyLevel::Observe).record_session(5);
    ledger.entry(AutonomyLevel::Cautious).record_session(1);

    assert_eq!(
        ledger.get(AutonomyLevel::Observe).unwrap().sessions_launched,
        1
    );
    assert_eq!(
        ledger.get(AutonomyLevel::Cautious).unwrap().sessions_launched,
        1
    );
    assert!(ledger.get(AutonomyLevel::Full).is_none());
}
