//! Adjustment scoring: per-source base confidence plus ordered additive
//! bumps. Vendor/operational advisories bypass the threshold table and
//! always resolve to `Category::Important`.

use crate::event::{Category, Confidence, NormalizedEvent, ScoredEvent};

use super::{ScoringContext, ScoringStrategy};

/// Base confidence by source tag. Primary regulatory feeds sit at or
/// above the High boundary; aggregators and bulletins below it.
fn base_score(source_tag: &str) -> i32 {
    match source_tag.to_ascii_lowercase().as_str() {
        "fda-device-recall" | "fda-drug-recall" | "fda-drug-shortage" => 60,
        "ashp-shortage" => 50,
        "cms-pfs" => 70,
        "federal-register" => 65,
        "cdph" | "rhb" => 60,
        "mbc" => 55,
        "vendor-advisory" => 55,
        "payer-bulletin" => 50,
        _ => 50,
    }
}

fn exact_device_match(event: &NormalizedEvent, ctx: &ScoringContext) -> bool {
    let Some(device) = event.device_descriptor.as_deref() else {
        return false;
    };
    ctx.tracked_devices
        .iter()
        .any(|d| d.eq_ignore_ascii_case(device))
}

fn tracked_code_match(event: &NormalizedEvent, ctx: &ScoringContext) -> bool {
    event
        .affected_codes
        .iter()
        .any(|c| ctx.tracked_codes.iter().any(|t| t == c))
}

pub struct AdjustmentStrategy;

impl ScoringStrategy for AdjustmentStrategy {
    fn name(&self) -> &'static str {
        "adjustment"
    }

    fn score(&self, event: &NormalizedEvent, ctx: &ScoringContext) -> ScoredEvent {
        let base = base_score(&event.source_tag);
        let mut score = base;
        let mut reasons = vec![format!("source {}: base {base}", event.source_tag)];

        // Corroborating secondary signal (+10)
        if ctx.corroborating_signal {
            score += 10;
            reasons.push("corroborating signal: +10".to_string());
        }

        // Spike detection with recall escalation
        if let Some(spike) = &ctx.spike {
            if spike.is_spike() {
                reasons.push(format!("spike: z-score {:.2}", spike.z_score()));
                if ctx.primary_recall_active {
                    score += 15;
                    reasons.push("spike + recall escalation: +15".to_string());
                }
            }
        }

        // Financial delta tiers
        if let Some(delta) = &event.rate_delta {
            let pct = delta.percent_change();
            let abs = pct.abs();
            if abs >= 10.0 {
                score += 20;
                reasons.push(format!("rate delta {pct:+.1}%: +20"));
            } else if abs >= 5.0 {
                score += 10;
                reasons.push(format!("rate delta {pct:+.1}%: +10"));
            }
        }

        // Personalization bumps
        if exact_device_match(event, ctx) {
            score += 15;
            reasons.push("exact device match: +15".to_string());
        }
        if tracked_code_match(event, ctx) {
            score += 15;
            reasons.push("tracked code match: +15".to_string());
        }

        let mut confidence = Confidence::from_score(score);

        // A secondary-source record corroborated by a primary source is
        // promoted to High confidence even if its score stays below the
        // boundary.
        if base < 60 && ctx.primary_recall_active && confidence != Confidence::High {
            confidence = Confidence::High;
            reasons.push("primary-source corroboration: confidence High".to_string());
        }

        // Vendor/operational advisories are always Important, regardless
        // of the computed score.
        let category = if event.vendor_advisory {
            reasons.push("vendor advisory: category Important".to_string());
            Category::Important
        } else {
            Category::from_score(score)
        };

        ScoredEvent {
            event: event.clone(),
            score,
            category,
            confidence,
            reasons,
        }
    }
}
