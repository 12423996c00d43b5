// tests/scoring_adjustment.rs
// Adjustment strategy: ordered bumps, spike escalation, vendor override,
// corroboration promotion.

use chrono::{TimeZone, Utc};
use radwatch::event::{Category, Confidence, NormalizedEvent, RateDelta};
use radwatch::score::{AdjustmentStrategy, ScoringContext, ScoringStrategy, SpikeStats};

fn event(source: &str) -> NormalizedEvent {
    NormalizedEvent {
        source_tag: source.into(),
        source_record_id: "r1".into(),
        title: "Contrast injector advisory".into(),
        description: "Firmware fault in injector control board".into(),
        occurred_at: Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap(),
        classification_tag: Some("Class II".into()),
        manufacturer: Some("Siemens Healthineers".into()),
        device_descriptor: Some("MAGNETOM Injector".into()),
        affected_codes: vec!["70553".into()],
        rate_delta: None,
        jurisdiction_tag: Some("CA".into()),
        vendor_advisory: false,
    }
}

fn spike(current: f64) -> SpikeStats {
    SpikeStats {
        current_count: current,
        historical_mean: 10.0,
        historical_std_dev: 2.0,
    }
}

#[test]
fn z_score_gate_at_two_sigma() {
    assert!((spike(16.0).z_score() - 3.0).abs() < 1e-9);
    assert!(spike(16.0).is_spike());
    assert!((spike(12.0).z_score() - 1.0).abs() < 1e-9);
    assert!(!spike(12.0).is_spike());
}

#[test]
fn spike_escalates_only_with_coinciding_recall() {
    let with_recall = ScoringContext {
        primary_recall_active: true,
        spike: Some(spike(16.0)),
        ..ScoringContext::default()
    };
    let without_recall = ScoringContext {
        spike: Some(spike(16.0)),
        ..ScoringContext::default()
    };
    let a = AdjustmentStrategy.score(&event("fda-device-recall"), &with_recall);
    let b = AdjustmentStrategy.score(&event("fda-device-recall"), &without_recall);
    assert_eq!(a.score, 75);
    assert_eq!(b.score, 60);
}

#[test]
fn vendor_advisory_is_important_at_any_score() {
    // Low end: bare payer bulletin flagged as an operational advisory.
    let mut low = event("payer-bulletin");
    low.vendor_advisory = true;
    low.affected_codes.clear();
    let scored = AdjustmentStrategy.score(&low, &ScoringContext::default());
    assert_eq!(scored.score, 50);
    assert_eq!(scored.category, Category::Important);
    assert_ne!(Category::from_score(scored.score), Category::Important);

    // High end: every bump stacked, score far above the Urgent line.
    let mut high = event("vendor-advisory");
    high.vendor_advisory = true;
    high.rate_delta = Some(RateDelta {
        old: 100.0,
        new: 120.0,
    });
    let ctx = ScoringContext {
        corroborating_signal: true,
        primary_recall_active: true,
        spike: Some(spike(20.0)),
        tracked_devices: vec!["MAGNETOM Injector".into()],
        tracked_codes: vec!["70553".into()],
        ..ScoringContext::default()
    };
    let scored = AdjustmentStrategy.score(&high, &ctx);
    assert!(scored.score >= 130, "stacked score was {}", scored.score);
    assert_eq!(scored.category, Category::Important);
}

#[test]
fn secondary_source_corroboration_promotes_confidence() {
    let ctx = ScoringContext {
        primary_recall_active: true,
        ..ScoringContext::default()
    };
    let scored = AdjustmentStrategy.score(&event("ashp-shortage"), &ctx);
    assert_eq!(scored.score, 50);
    assert_eq!(scored.confidence, Confidence::High);

    // A primary source needs no promotion: already High at base 70.
    let scored = AdjustmentStrategy.score(&event("cms-pfs"), &ctx);
    assert_eq!(scored.confidence, Confidence::High);
    assert!(!scored
        .reasons
        .iter()
        .any(|r| r.contains("confidence High")));
}

#[test]
fn reasons_are_byte_identical_across_calls() {
    let ctx = ScoringContext {
        corroborating_signal: true,
        primary_recall_active: true,
        spike: Some(spike(16.0)),
        tracked_codes: vec!["70553".into()],
        ..ScoringContext::default()
    };
    let ev = event("fda-device-recall");
    let a = serde_json::to_vec(&AdjustmentStrategy.score(&ev, &ctx)).unwrap();
    let b = serde_json::to_vec(&AdjustmentStrategy.score(&ev, &ctx)).unwrap();
    assert_eq!(a, b);
}
