//! Additive weighted scoring: five bounded factor contributions summed
//! into a 0–100 scale, categorized by the 85/75/50 threshold table.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::event::{Category, Confidence, NormalizedEvent, ScoredEvent};

use super::{ScoringContext, ScoringStrategy};

/// Imaging-domain keywords for the relevance factor. Substring matches,
/// deliberately stemmed ("mammograph" covers -y/-ic).
const DOMAIN_KEYWORDS: &[&str] = &[
    "ct",
    "mri",
    "x-ray",
    "ultrasound",
    "mammograph",
    "fluoroscop",
    "radiograph",
    "imaging",
    "scanner",
    "contrast",
    "nuclear medicine",
    "pet",
    "spect",
    "angiograph",
    "interventional",
];

/// Source reliability, 0–30. Primary regulatory authorities rank highest.
fn source_reliability(source_tag: &str) -> i32 {
    let tag = source_tag.to_ascii_lowercase();
    if tag.starts_with("fda") || tag.starts_with("openfda") {
        30
    } else if tag.starts_with("cms") {
        28
    } else if tag.starts_with("federal-register") || tag.starts_with("fedreg") {
        25
    } else if tag.starts_with("cdph") || tag.starts_with("rhb") {
        22
    } else if tag.starts_with("mbc") {
        20
    } else {
        15
    }
}

/// Domain relevance, 0–25, tiered by keyword match count.
fn domain_relevance(haystack: &str) -> (i32, usize) {
    let matches = DOMAIN_KEYWORDS
        .iter()
        .filter(|k| haystack.contains(*k))
        .count();
    let pts = if matches >= 3 {
        25
    } else if matches == 2 {
        20
    } else if matches == 1 {
        15
    } else if haystack.contains("medical") || haystack.contains("hospital") {
        8
    } else {
        0
    };
    (pts, matches)
}

/// Risk level, 0–25. Class matching is word-boundary aware so that
/// "class ii"/"class iii" never fall into the "class i" tier.
fn risk_level(haystack: &str) -> i32 {
    static RE_I: OnceCell<Regex> = OnceCell::new();
    static RE_II: OnceCell<Regex> = OnceCell::new();
    static RE_III: OnceCell<Regex> = OnceCell::new();
    let re_i = RE_I.get_or_init(|| Regex::new(r"class\s+i\b").unwrap());
    let re_ii = RE_II.get_or_init(|| Regex::new(r"class\s+ii\b").unwrap());
    let re_iii = RE_III.get_or_init(|| Regex::new(r"class\s+iii\b").unwrap());

    if re_i.is_match(haystack)
        || haystack.contains("death")
        || haystack.contains("serious injury")
    {
        25
    } else if re_ii.is_match(haystack)
        || haystack.contains("injury")
        || haystack.contains("malfunction")
    {
        18
    } else if re_iii.is_match(haystack) || haystack.contains("labeling") {
        10
    } else if haystack.contains("recall") || haystack.contains("safety") {
        12
    } else {
        5
    }
}

/// Jurisdiction relevance, 0–10, degrading from exact target through
/// nationwide to unrelated.
fn jurisdiction_relevance(location: &str, ctx: &ScoringContext) -> i32 {
    let tokens: Vec<&str> = location
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let token_match = |needle: &str| {
        // Short aliases ("ca") match whole tokens only; longer names may
        // appear embedded ("Statewide California").
        if needle.len() <= 3 {
            tokens.iter().any(|t| t.eq_ignore_ascii_case(needle))
        } else {
            location.contains(needle)
        }
    };

    if ctx.target_jurisdiction.iter().any(|j| token_match(j)) {
        10
    } else if token_match("nationwide") || token_match("us") || token_match("national") {
        8
    } else if ctx.adjacent_regions.iter().any(|r| token_match(r)) {
        6
    } else {
        3
    }
}

/// Financial impact, 0–10, tiered by rate-change magnitude when present.
fn financial_impact(event: &NormalizedEvent) -> i32 {
    if let Some(delta) = &event.rate_delta {
        let pct = delta.percent_change().abs();
        if pct >= 10.0 {
            10
        } else if pct >= 5.0 {
            7
        } else {
            4
        }
    } else if !event.affected_codes.is_empty() {
        6
    } else {
        2
    }
}

pub struct AdditiveStrategy;

impl ScoringStrategy for AdditiveStrategy {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn score(&self, event: &NormalizedEvent, ctx: &ScoringContext) -> ScoredEvent {
        let text = format!("{} {}", event.title, event.description).to_ascii_lowercase();
        let risk_text = format!(
            "{} {}",
            event.classification_tag.as_deref().unwrap_or_default(),
            event.description
        )
        .to_ascii_lowercase();
        let location = event
            .jurisdiction_tag
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut reasons = Vec::with_capacity(5);

        let source = source_reliability(&event.source_tag);
        reasons.push(format!("source reliability: +{source}"));

        let (relevance, matched) = domain_relevance(&text);
        reasons.push(format!(
            "domain relevance: +{relevance} ({matched} keyword matches)"
        ));

        let risk = risk_level(&risk_text);
        reasons.push(format!("risk level: +{risk}"));

        let jurisdiction = jurisdiction_relevance(&location, ctx);
        reasons.push(format!("jurisdiction relevance: +{jurisdiction}"));

        let financial = financial_impact(event);
        reasons.push(format!("financial impact: +{financial}"));

        let score = source + relevance + risk + jurisdiction + financial;

        ScoredEvent {
            event: event.clone(),
            score,
            category: Category::from_score(score),
            confidence: Confidence::from_score(score),
            reasons,
        }
    }
}
