//! # Scoring Engine
//! Deterministic, side-effect-free mapping from `(NormalizedEvent,
//! ScoringContext)` to a `ScoredEvent`.
//!
//! Two scoring policies coexist on purpose and are exposed as named
//! strategies behind one trait: `Additive` sums five bounded factor
//! contributions; `Adjustment` starts from a per-source base confidence
//! and applies ordered bumps. Their thresholds differ intentionally
//! (they operate on different underlying scales); do not merge them.

pub mod additive;
pub mod adjustment;

use serde::{Deserialize, Serialize};

use crate::event::{NormalizedEvent, ScoredEvent};

pub use additive::AdditiveStrategy;
pub use adjustment::AdjustmentStrategy;

/// Frequency stats for spike detection over related events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeStats {
    pub current_count: f64,
    pub historical_mean: f64,
    pub historical_std_dev: f64,
}

impl SpikeStats {
    /// z = (current − mean) / stddev; 0 when stddev is 0.
    pub fn z_score(&self) -> f64 {
        if self.historical_std_dev == 0.0 {
            0.0
        } else {
            (self.current_count - self.historical_mean) / self.historical_std_dev
        }
    }

    pub fn is_spike(&self) -> bool {
        self.z_score() >= 2.0
    }
}

/// Contextual factors supplied by the caller. Computed fresh per scoring
/// call; never cached between records.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    /// Jurisdiction the deployment cares about, lower-cased tokens
    /// (e.g. ["ca", "california"]).
    pub target_jurisdiction: Vec<String>,
    /// Broader regions that still partially apply (e.g. ["west", "pacific"]).
    pub adjacent_regions: Vec<String>,
    /// Personalization: tracked device descriptors, exact match (case-insensitive).
    pub tracked_devices: Vec<String>,
    /// Personalization: tracked domain codes, exact match.
    pub tracked_codes: Vec<String>,
    /// A corroborating secondary signal exists for this event (e.g. an
    /// adverse-event database hit).
    pub corroborating_signal: bool,
    /// A primary-source recall coincides with this event.
    pub primary_recall_active: bool,
    /// Frequency stats for spike detection, when available.
    pub spike: Option<SpikeStats>,
}

impl ScoringContext {
    pub fn california_default() -> Self {
        Self {
            target_jurisdiction: vec!["ca".into(), "california".into()],
            adjacent_regions: vec!["west".into(), "pacific".into()],
            ..Self::default()
        }
    }
}

/// A scoring policy. Implementations must be pure: identical inputs
/// always produce an identical `ScoredEvent`, including `reasons` order.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, event: &NormalizedEvent, ctx: &ScoringContext) -> ScoredEvent;
}

/// Config-selectable strategy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Additive,
    Adjustment,
}

pub fn strategy_for(mode: ScoringMode) -> Box<dyn ScoringStrategy> {
    match mode {
        ScoringMode::Additive => Box::new(AdditiveStrategy),
        ScoringMode::Adjustment => Box::new(AdjustmentStrategy),
    }
}
