// tests/dedup_window.rs
// Windowed suppression: near-identical reports collapse inside 14 days
// and survive outside it.

use chrono::{Duration, TimeZone, Utc};
use radwatch::dedup::{EventSignature, SignatureTable};

fn sig(description: &str) -> EventSignature {
    EventSignature::new(
        "GE Healthcare",
        "Revolution CT",
        "Class II",
        description,
    )
}

#[test]
fn near_identical_reports_share_a_signature() {
    let a = sig("Software malfunction affecting image quality in recent builds");
    let b = sig("  SOFTWARE malfunction — affecting image/quality; repeat notice");
    assert_eq!(a, b);
}

#[test]
fn one_day_apart_is_dropped_fifteen_days_apart_is_kept() {
    let table = SignatureTable::with_window_days(14);
    let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 6, 0, 0).unwrap();
    let s = sig("Software malfunction affecting image quality in recent builds");

    assert!(!table.check_and_record(&s, t0), "first sighting kept");
    assert!(
        table.check_and_record(&s, t0 + Duration::days(1)),
        "second sighting one day later dropped"
    );

    let table = SignatureTable::with_window_days(14);
    assert!(!table.check_and_record(&s, t0));
    assert!(
        !table.check_and_record(&s, t0 + Duration::days(15)),
        "second sighting fifteen days later kept"
    );
}

#[test]
fn first_seen_wins_for_the_whole_window() {
    let table = SignatureTable::with_window_days(14);
    let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 6, 0, 0).unwrap();
    let s = sig("same reason");

    assert!(!table.check_and_record(&s, t0));
    // repeated sightings never refresh the anchor...
    for day in 1..=13 {
        assert!(table.check_and_record(&s, t0 + Duration::days(day)));
    }
    // ...so day 15 from the FIRST sighting is outside the window.
    assert!(!table.check_and_record(&s, t0 + Duration::days(15)));
}

#[test]
fn different_identity_fields_never_collide() {
    let table = SignatureTable::with_window_days(14);
    let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 6, 0, 0).unwrap();
    let a = EventSignature::new("GE", "Revolution CT", "Class II", "reason text here");
    let b = EventSignature::new("GE", "Optima CT660", "Class II", "reason text here");
    assert!(!table.check_and_record(&a, t0));
    assert!(!table.check_and_record(&b, t0));
    assert_eq!(table.len(), 2);
}
