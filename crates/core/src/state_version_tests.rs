use super::*;

#[test]
fn bump_is_monotonically_increasing() {
    let version = StateVersion::new(0);
    assert_eq!(version.bump(), 1);
    assert_eq!(version.bump(), 2);
    assert_eq!(version.current(), 2);
}

#[test]
fn round_trips_through_json() {
    let version = StateVersion::new(7);
    let json = serde_json::to_string(&version).unwrap();
    assert_eq!(json, "7");
    let back: StateVersion = serde_json::from_str(&json).unwrap();
    assert_eq!(back.current(), 7);
}
