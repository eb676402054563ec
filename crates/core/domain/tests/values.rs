use domain::{Clock, ConnectionPhase, ManualClock, PointKind, TagValue};
use std::time::Duration;

#[test]
fn tag_value_coercions() {
    assert_eq!(TagValue::Numeric(12.5).as_f32(), 12.5);
    assert_eq!(TagValue::Bool(true).as_f32(), 1.0);
    assert!(TagValue::Numeric(-0.5).as_bool());
    assert!(!TagValue::Numeric(0.0).as_bool());
    assert!(!TagValue::Bool(false).as_bool());
}

#[test]
fn labels_are_stable() {
    assert_eq!(PointKind::CoilWrite.to_string(), "coil_write");
    assert_eq!(ConnectionPhase::Connected.to_string(), "CONNECTED");
}

#[test]
fn manual_clock_advances() {
    let clock = ManualClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(1500));
    assert_eq!(clock.now() - start, Duration::from_millis(1500));
}
