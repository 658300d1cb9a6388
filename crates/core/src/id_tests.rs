use super::*;

define_id! {
    pub struct TestId;
}

#[test]
fn short_truncates_long_ids() {
    let id = TestId::new("0123456789abcdef");
    assert_eq!(id.short(8), "01234567");
}

#[test]
fn short_passes_through_short_ids() {
    let id = TestId::new("ab");
    assert_eq!(id.short(8), "ab");
}

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("t");
    assert_eq!(gen.next(), "t-1");
    assert_eq!(gen.next(), "t-2");
}

#[test]
fn uuid_id_gen_produces_unique_values() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
}

#[test]
fn id_equality_with_str() {
    let id = TestId::new("abc");
    assert_eq!(id, "abc");
    assert_eq!(id, *"abc");
}
