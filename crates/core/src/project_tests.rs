use super::*;

#[test]
fn new_project_has_empty_snapshot() {
    let p = Project::new("acme-api", "/projects/acme-api");
    assert_eq!(p.name, "acme-api");
    assert!(!p.snapshot.needs_attention);
    assert!(p.snapshot.blockers.is_empty());
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut snap = ProjectSnapshot::default();
    snap.needs_attention = true;
    snap.attention_reason = Some("build broken".into());
    let json = serde_json::to_string(&snap).expect("serialize");
    let back: ProjectSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(snap, back);
}
