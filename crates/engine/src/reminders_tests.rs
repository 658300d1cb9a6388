use super::*;
use fleetd_core::SequentialIdGen;

async fn engine() -> ReminderEngine<SequentialIdGen> {
    let db = Database::connect_in_memory().await.unwrap();
    ReminderEngine::new(db, SequentialIdGen::new("rem"))
}

#[tokio::test]
async fn set_then_list_pending_returns_it_ordered_by_fire_time() {
    let engine = engine().await;
    engine.set("take out trash", 2_000).await.unwrap();
    engine.set("call accountant", 1_000).await.unwrap();

    let pending = engine.list_pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].text, "call accountant");
    assert_eq!(pending[1].text, "take out trash");
}

#[tokio::test]
async fn cancel_by_text_fuzzy_matches_and_removes() {
    let engine = engine().await;
    engine.set("renew passport before trip", 5_000).await.unwrap();

    let cancelled = engine.cancel_by_text("passport").await.unwrap();
    assert_eq!(cancelled.text, "renew passport before trip");
    assert!(engine.list_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_by_text_errors_when_nothing_matches() {
    let engine = engine().await;
    engine.set("water the plants", 5_000).await.unwrap();

    let result = engine.cancel_by_text("nonexistent thing").await;
    assert!(matches!(result, Err(ReminderError::NoMatch(_))));
}

#[tokio::test]
async fn check_and_fire_accepts_past_timestamps_and_marks_fired() {
    let engine = engine().await;
    engine.set("overdue reminder", 0).await.unwrap();
    engine.set("future reminder", 1_000_000).await.unwrap();

    let fired = engine.check_and_fire(500).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].text, "overdue reminder");

    // marked fired: a second check at the same time does not refire it.
    let fired_again = engine.check_and_fire(500).await.unwrap();
    assert!(fired_again.is_empty());

    let pending = engine.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "future reminder");
}
