use super::*;

#[test]
fn session_name_sanitizes_project_path() {
    let name = SessionName::for_project("Client Work/acme_API");
    assert_eq!(name.as_str(), "orch-client-work-acme-api");
}

#[test]
fn session_name_round_trips_project_part() {
    let name = SessionName::for_project("acme-api");
    assert_eq!(name.project_part(), Some("acme-api"));
}

#[test]
fn duration_is_never_negative() {
    let session = SessionRecord::new("acme-api", "resume", 1_000);
    assert_eq!(session.duration_ms(500), 0);
    assert_eq!(session.duration_ms(1_500), 500);
}
