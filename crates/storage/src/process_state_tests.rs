use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn load_with_missing_file_starts_from_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = ProcessStateStore::load(&path).unwrap();
    assert_eq!(store.state().state_version.current(), 0);
    assert_eq!(store.state().runtime_autonomy_level, AutonomyLevel::Observe);
}

#[test]
fn with_state_persists_and_bumps_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut store = ProcessStateStore::load(&path).unwrap();

    store
        .with_state(|state| {
            state.last_row_id = 42;
        })
        .unwrap();

    assert_eq!(store.state().state_version.current(), 1);

    let reloaded = ProcessStateStore::load(&path).unwrap();
    assert_eq!(reloaded.state().last_row_id, 42);
    assert_eq!(reloaded.state().state_version.current(), 1);
}

#[test]
fn decision_history_is_capped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut store = ProcessStateStore::load(&path).unwrap();

    store
        .with_state(|state| {
            for i in 0..60 {
                state.push_decision(json!({ "i": i }));
            }
        })
        .unwrap();

    assert_eq!(store.state().ai_decision_history.len(), 50);
    assert_eq!(store.state().ai_decision_history[0]["i"], 10);
}

#[test]
fn absent_keys_default_on_partial_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"lastRowId": 7}"#).unwrap();

    let store = ProcessStateStore::load(&path).unwrap();
    assert_eq!(store.state().last_row_id, 7);
    assert_eq!(store.state().execution_history.len(), 0);
}
