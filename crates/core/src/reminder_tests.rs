use super::*;

#[test]
fn past_timestamps_are_due_immediately() {
    let reminder = Reminder::new(ReminderId::new("r1"), "check certs", 500, 1_000);
    assert!(reminder.is_due(1_000));
}

#[test]
fn fired_reminders_never_re_fire() {
    let mut reminder = Reminder::new(ReminderId::new("r1"), "check certs", 500, 1_000);
    reminder.mark_fired();
    assert!(!reminder.is_due(10_000));
}

#[test]
fn future_reminders_are_not_due() {
    let reminder = Reminder::new(ReminderId::new("r1"), "check certs", 5_000, 1_000);
    assert!(!reminder.is_due(1_000));
}

#[test]
fn query_matches_exact_substring() {
    let reminder = Reminder::new(ReminderId::new("r1"), "check SSL certs", 5_000, 1_000);
    assert!(reminder.matches_query("ssl certs"));
}

#[test]
fn query_matches_near_miss_typo() {
    let reminder = Reminder::new(ReminderId::new("r1"), "renew certs", 5_000, 1_000);
    assert!(reminder.matches_query("renew cert"));
}

#[test]
fn query_rejects_unrelated_text() {
    let reminder = Reminder::new(ReminderId::new("r1"), "renew certs", 5_000, 1_000);
    assert!(!reminder.matches_query("deploy backend"));
}
