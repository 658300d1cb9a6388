use super::*;

#[test]
fn ordering_follows_urgency() {
    assert!(NotificationTier::Urgent < NotificationTier::Action);
    assert!(NotificationTier::Action < NotificationTier::Summary);
    assert!(NotificationTier::Summary < NotificationTier::Debug);
}

#[test]
fn from_u8_rejects_out_of_range() {
    assert_eq!(NotificationTier::from_u8(1), Some(NotificationTier::Urgent));
    assert_eq!(NotificationTier::from_u8(0), None);
    assert_eq!(NotificationTier::from_u8(5), None);
}
