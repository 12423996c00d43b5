//! # Routing Decision
//! Combines category, quota availability and channel eligibility into a
//! `NotificationPlan`. Category is terminal input here: it was assigned
//! once by the scoring engine and never changes.
//!
//! Enrichment is requested for Urgent and Informational records only,
//! and only when the quota governor grants a unit; a denied or failed
//! enrichment never blocks or delays delivery (the caller substitutes
//! the rule-based summary).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Category, ScoredEvent};
use crate::quota::QuotaGovernor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

/// Template family keyed to the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentVariant {
    UrgentTemplate,
    ShortForm,
    DigestTemplate,
    OperationalNotice,
    Suppressed,
}

/// Output of the routing decision; handed to the notification senders.
/// Recipient resolution is an external collaborator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub channels: Vec<Channel>,
    pub content_variant: ContentVariant,
    /// True when a unit of enrichment budget was granted for this record.
    pub enrichment_granted: bool,
}

impl NotificationPlan {
    pub fn silent(variant: ContentVariant) -> Self {
        Self {
            channels: Vec::new(),
            content_variant: variant,
            enrichment_granted: false,
        }
    }
}

/// Categories eligible for enrichment (mirrors the summarize policy of
/// the scoring thresholds: only immediate, score-driven alerts).
pub fn wants_enrichment(category: Category) -> bool {
    matches!(category, Category::Urgent | Category::Informational)
}

/// Decide channels, template and enrichment budget for one scored event.
///
/// Policy:
/// - Suppressed: nothing, not surfaced anywhere.
/// - Digest: batched into the periodic summary, no immediate channel.
/// - Informational: email, short-form template, opportunistic enrichment.
/// - Urgent: email + SMS (when opted in); quota exhaustion must never
///   block the notification.
/// - Important: email, independent of the numeric score.
pub fn decide_routing(
    scored: &ScoredEvent,
    quota: &QuotaGovernor,
    now: DateTime<Utc>,
    sms_opt_in: bool,
) -> NotificationPlan {
    match scored.category {
        Category::Suppressed => NotificationPlan::silent(ContentVariant::Suppressed),
        Category::Digest => NotificationPlan::silent(ContentVariant::DigestTemplate),
        Category::Informational => NotificationPlan {
            channels: vec![Channel::Email],
            content_variant: ContentVariant::ShortForm,
            enrichment_granted: quota.try_consume(now),
        },
        Category::Urgent => {
            let mut channels = vec![Channel::Email];
            if sms_opt_in {
                channels.push(Channel::Sms);
            }
            NotificationPlan {
                channels,
                content_variant: ContentVariant::UrgentTemplate,
                enrichment_granted: quota.try_consume(now),
            }
        }
        Category::Important => NotificationPlan {
            channels: vec![Channel::Email],
            content_variant: ContentVariant::OperationalNotice,
            enrichment_granted: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Confidence, NormalizedEvent};
    use chrono::Utc;

    fn scored(category: Category) -> ScoredEvent {
        ScoredEvent {
            event: NormalizedEvent {
                source_tag: "fda-device-recall".into(),
                source_record_id: "r".into(),
                title: "t".into(),
                description: String::new(),
                occurred_at: Utc::now(),
                classification_tag: None,
                manufacturer: None,
                device_descriptor: None,
                affected_codes: vec![],
                rate_delta: None,
                jurisdiction_tag: None,
                vendor_advisory: false,
            },
            score: 80,
            category,
            confidence: Confidence::High,
            reasons: vec![],
        }
    }

    #[test]
    fn suppressed_has_no_channels() {
        let quota = QuotaGovernor::new(6);
        let plan = decide_routing(&scored(Category::Suppressed), &quota, Utc::now(), true);
        assert!(plan.channels.is_empty());
        assert_eq!(plan.content_variant, ContentVariant::Suppressed);
        // no budget consumed for a silent record
        assert_eq!(quota.status(Utc::now()).calls_used_today, 0);
    }

    #[test]
    fn digest_is_batched_not_immediate() {
        let quota = QuotaGovernor::new(6);
        let plan = decide_routing(&scored(Category::Digest), &quota, Utc::now(), true);
        assert!(plan.channels.is_empty());
        assert_eq!(plan.content_variant, ContentVariant::DigestTemplate);
    }

    #[test]
    fn informational_is_email_only() {
        let quota = QuotaGovernor::new(6);
        let plan = decide_routing(&scored(Category::Informational), &quota, Utc::now(), true);
        assert_eq!(plan.channels, vec![Channel::Email]);
        assert!(plan.enrichment_granted);
    }

    #[test]
    fn enrichment_is_for_immediate_scored_alerts_only() {
        assert!(wants_enrichment(Category::Urgent));
        assert!(wants_enrichment(Category::Informational));
        assert!(!wants_enrichment(Category::Digest));
        assert!(!wants_enrichment(Category::Important));
        assert!(!wants_enrichment(Category::Suppressed));
    }

    #[test]
    fn urgent_adds_sms_when_opted_in() {
        let quota = QuotaGovernor::new(6);
        let now = Utc::now();
        let plan = decide_routing(&scored(Category::Urgent), &quota, now, true);
        assert_eq!(plan.channels, vec![Channel::Email, Channel::Sms]);

        let plan = decide_routing(&scored(Category::Urgent), &quota, now, false);
        assert_eq!(plan.channels, vec![Channel::Email]);
    }

    #[test]
    fn quota_exhaustion_never_drops_urgent_channels() {
        let quota = QuotaGovernor::new(0);
        let plan = decide_routing(&scored(Category::Urgent), &quota, Utc::now(), true);
        assert!(!plan.enrichment_granted);
        assert_eq!(plan.channels, vec![Channel::Email, Channel::Sms]);
    }

    #[test]
    fn important_is_email_regardless_of_score() {
        let quota = QuotaGovernor::new(0);
        let mut s = scored(Category::Important);
        s.score = 10;
        let plan = decide_routing(&s, &quota, Utc::now(), false);
        assert_eq!(plan.channels, vec![Channel::Email]);
        assert_eq!(plan.content_variant, ContentVariant::OperationalNotice);
    }
}
