use super::*;

#[test]
fn starts_closed() {
    let mut breaker = CircuitBreaker::default();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(!breaker.is_open(0));
}

#[test]
fn opens_after_threshold_consecutive_failures() {
    let mut breaker = CircuitBreaker::new(3, 300_000);
    breaker.record_failure(0);
    breaker.record_failure(1_000);
    assert_eq!(breaker.state(), BreakerState::Closed);
    breaker.record_failure(2_000);
    assert_eq!(breaker.state(), BreakerState::Open);
}

#[test]
fn cooldown_scenario_matches_s5() {
    let mut breaker = CircuitBreaker::new(3, 300_000);
    breaker.record_failure(0);
    breaker.record_failure(1_000);
    breaker.record_failure(2_000);
    assert_eq!(breaker.state(), BreakerState::Open);

    // t=100s: still within cooldown, rejected without a state change.
    assert!(breaker.is_open(100_000));
    assert_eq!(breaker.state(), BreakerState::Open);

    // t=305s: cooldown elapsed, transitions to half-open and allows a probe.
    assert!(!breaker.is_open(305_000));
    assert_eq!(breaker.state(), BreakerState::HalfOpen);

    breaker.record_success();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert_eq!(breaker.consecutive_failures(), 0);
}

#[test]
fn half_open_failure_reopens_immediately() {
    let mut breaker = CircuitBreaker::new(3, 300_000);
    breaker.record_failure(0);
    breaker.record_failure(1_000);
    breaker.record_failure(2_000);
    breaker.is_open(305_000);
    assert_eq!(breaker.state(), BreakerState::HalfOpen);

    breaker.record_failure(305_100);
    assert_eq!(breaker.state(), BreakerState::Open);
}

#[test]
fn unaffected_before_cooldown_elapses() {
    let mut breaker = CircuitBreaker::new(3, 300_000);
    breaker.record_failure(0);
    breaker.record_failure(1_000);
    breaker.record_failure(2_000);
    assert!(breaker.is_open(299_999 + 2_000 - 1));
}
