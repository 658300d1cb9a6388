use super::*;

#[test]
fn fake_clock_advances_explicitly() {
    let clock = FakeClock::new(1_000);
    assert_eq!(clock.now_ms(), 1_000);
    clock.advance_ms(500);
    assert_eq!(clock.now_ms(), 1_500);
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::new(0);
    clock.set_ms(9_999);
    assert_eq!(clock.now_ms(), 9_999);
}

#[test]
fn system_clock_is_monotonic_non_decreasing() {
    let clock = SystemClock;
    let a = clock.now_ms();
    let b = clock.now_ms();
    assert!(b >= a);
}
