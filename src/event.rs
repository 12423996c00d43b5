//! event.rs: canonical record shapes flowing through the engine.
//!
//! A `RawSourceRecord` is whatever an adapter pulled from its source.
//! The normalizer reduces it to a `NormalizedEvent`; the scoring engine
//! wraps that into a `ScoredEvent`. Scored events are write-once: nothing
//! downstream mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, source-shaped payload as fetched by a source adapter.
/// Consumed exactly once by the normalizer and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceRecord {
    pub source_tag: String,
    pub payload: serde_json::Value,
}

impl RawSourceRecord {
    pub fn new(source_tag: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            source_tag: source_tag.into(),
            payload,
        }
    }
}

/// Old/new reimbursement rate pair attached to payment-schedule changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateDelta {
    pub old: f64,
    pub new: f64,
}

impl RateDelta {
    /// Percentage change relative to the old rate; 0.0 when the old rate is 0.
    pub fn percent_change(&self) -> f64 {
        if self.old == 0.0 {
            0.0
        } else {
            ((self.new - self.old) / self.old) * 100.0
        }
    }
}

/// Canonical event shape. `source_tag` + `source_record_id` identify a
/// logical record within its source; immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub source_tag: String,
    pub source_record_id: String,
    /// Never empty; the normalizer synthesizes a title when the source omits one.
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_descriptor: Option<String>,
    /// Affected domain codes (e.g. procedure codes), source order preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_delta: Option<RateDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction_tag: Option<String>,
    /// Vendor/operational advisories resolve to `Category::Important`
    /// regardless of score under the adjustment strategy.
    #[serde(default)]
    pub vendor_advisory: bool,
}

/// Terminal urgency classification. Assigned once by the scoring engine;
/// routing treats it as input, never as mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Urgent,
    Informational,
    Digest,
    Suppressed,
    Important,
}

impl Category {
    /// Threshold table shared by both scoring strategies.
    pub fn from_score(score: i32) -> Self {
        if score >= 85 {
            Category::Urgent
        } else if score >= 75 {
            Category::Informational
        } else if score >= 50 {
            Category::Digest
        } else {
            Category::Suppressed
        }
    }

    /// Sort rank for listings and digests (lower sorts first).
    pub fn rank(&self) -> u8 {
        match self {
            Category::Urgent => 1,
            Category::Informational => 2,
            Category::Digest => 3,
            Category::Important => 4,
            Category::Suppressed => 5,
        }
    }

    /// Categories that trigger a per-record notification.
    pub fn is_immediate(&self) -> bool {
        matches!(
            self,
            Category::Urgent | Category::Informational | Category::Important
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: i32) -> Self {
        if score >= 60 {
            Confidence::High
        } else if score >= 50 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Scoring output. `reasons` holds "label: contribution" strings in the
/// order contributions were applied; the ordering is load-bearing for
/// audit output and is asserted by tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub event: NormalizedEvent,
    pub score: i32,
    pub category: Category,
    pub confidence: Confidence,
    #[serde(default)]
    pub reasons: Vec<String>,
}
