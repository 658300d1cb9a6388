use super::*;
use fleetd_core::AutonomyLevel;

#[tokio::test]
async fn reminders_round_trip_and_fire() {
    let db = Database::connect_in_memory().await.unwrap();
    let id = ReminderId::new("r1");
    db.insert_reminder(&id, "check certs", 1_000).await.unwrap();

    let pending = db.list_pending_reminders().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "check certs");

    let due = db.due_reminders(1_000).await.unwrap();
    assert_eq!(due.len(), 1);

    db.mark_reminder_fired(&id).await.unwrap();
    let pending_after = db.list_pending_reminders().await.unwrap();
    assert!(pending_after.is_empty());
}

#[tokio::test]
async fn cancel_reminder_only_affects_pending_rows() {
    let db = Database::connect_in_memory().await.unwrap();
    let id = ReminderId::new("r1");
    db.insert_reminder(&id, "check certs", 1_000).await.unwrap();

    assert!(db.cancel_reminder(&id).await.unwrap());
    assert!(!db.cancel_reminder(&id).await.unwrap());
}

#[tokio::test]
async fn conversation_entries_round_trip_in_order() {
    let db = Database::connect_in_memory().await.unwrap();
    db.insert_conversation_entry(&ConversationEntry::new(Role::User, "hello", 1_000))
        .await
        .unwrap();
    db.insert_conversation_entry(&ConversationEntry::new(Role::Assistant, "hi there", 2_000))
        .await
        .unwrap();

    let recent = db.recent_conversation(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].text, "hello");
    assert_eq!(recent[1].text, "hi there");
}

#[tokio::test]
async fn trust_summary_upserts_by_level() {
    let db = Database::connect_in_memory().await.unwrap();
    let mut summary = TrustSummary::default();
    summary.record_session(4);
    db.upsert_trust_summary(AutonomyLevel::Cautious, &summary)
        .await
        .unwrap();

    summary.record_session(2);
    db.upsert_trust_summary(AutonomyLevel::Cautious, &summary)
        .await
        .unwrap();

    let ledger = db.load_trust_ledger().await.unwrap();
    let stored = ledger.get(AutonomyLevel::Cautious).unwrap();
    assert_eq!(stored.sessions_launched, 2);
    assert_eq!(stored.score_sum, 6);
}

#[tokio::test]
async fn revenue_snapshots_store_unreachable_reason() {
    let db = Database::connect_in_memory().await.unwrap();
    let snapshot = RevenueSnapshot::unreachable("stripe", "timed out", 1_000);
    db.insert_revenue_snapshot(&snapshot).await.unwrap();
}
