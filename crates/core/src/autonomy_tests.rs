use super::*;
use yare::parameterized;

#[test]
fn levels_are_totally_ordered() {
    assert!(AutonomyLevel::Observe < AutonomyLevel::Cautious);
    assert!(AutonomyLevel::Cautious < AutonomyLevel::Moderate);
    assert!(AutonomyLevel::Moderate < AutonomyLevel::Full);
}

#[test]
fn default_is_observe() {
    assert_eq!(AutonomyLevel::default(), AutonomyLevel::Observe);
}

#[test]
fn next_stops_at_full() {
    assert_eq!(AutonomyLevel::Full.next(), None);
    assert_eq!(AutonomyLevel::Observe.next(), Some(AutonomyLevel::Cautious));
}

#[test]
fn parses_from_str_case_insensitively() {
    assert_eq!("FULL".parse::<AutonomyLevel>().unwrap(), AutonomyLevel::Full);
    assert!("bogus".parse::<AutonomyLevel>().is_err());
}

#[parameterized(
    observe_start = { AutonomyLevel::Observe, ActionKind::Start, AutonomyVerdict::SmsOnly },
    observe_stop = { AutonomyLevel::Observe, ActionKind::Stop, AutonomyVerdict::SmsOnly },
    observe_skip = { AutonomyLevel::Observe, ActionKind::Skip, AutonomyVerdict::Log },
    cautious_start = { AutonomyLevel::Cautious, ActionKind::Start, AutonomyVerdict::Execute },
    cautious_stop = { AutonomyLevel::Cautious, ActionKind::Stop, AutonomyVerdict::SmsOnly },
    cautious_notify = { AutonomyLevel::Cautious, ActionKind::Notify, AutonomyVerdict::Execute },
    moderate_stop = { AutonomyLevel::Moderate, ActionKind::Stop, AutonomyVerdict::Execute },
    moderate_restart = { AutonomyLevel::Moderate, ActionKind::Restart, AutonomyVerdict::Execute },
    full_stop = { AutonomyLevel::Full, ActionKind::Stop, AutonomyVerdict::Execute },
    full_skip = { AutonomyLevel::Full, ActionKind::Skip, AutonomyVerdict::Log },
)]
fn matrix_matches_spec_table(level: AutonomyLevel, action: ActionKind, expected: AutonomyVerdict) {
    assert_eq!(autonomy_matrix(level, action), expected);
}

#[test]
fn action_kind_round_trips_through_str() {
    for action in ActionKind::ALLOWLIST {
        let parsed: ActionKind = action.as_str().parse().expect("parses");
        assert_eq!(parsed, action);
    }
}
