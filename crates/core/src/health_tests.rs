use super::*;

#[test]
fn up_result_has_no_error() {
    let result = HealthCheckResult::up("oracle", 42, 1_000);
    assert!(result.is_up());
    assert!(result.error.is_none());
    assert_eq!(result.consecutive_fails, 0);
}

#[test]
fn down_result_tracks_consecutive_fails() {
    let result = HealthCheckResult::down("oracle", "connection refused", 3, 1_000);
    assert!(!result.is_up());
    assert_eq!(result.consecutive_fails, 3);
    assert_eq!(result.error.as_deref(), Some("connection refused"));
}
