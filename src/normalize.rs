//! # Normalizer
//! Maps a raw, source-shaped payload into a `NormalizedEvent`.
//!
//! Total by contract: a field that cannot be extracted is defaulted or
//! omitted, and a record is never discarded here. All source-specific
//! field probing lives in this module so scoring, dedup and routing only
//! ever see one well-typed shape.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::event::{NormalizedEvent, RateDelta, RawSourceRecord};

/// Normalize free text: HTML-entity decode, tag strip, quote fixups,
/// whitespace collapse, length cap.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }
    out
}

/// First string value among `keys`, cleaned; None when absent or blank.
fn str_field(payload: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(v) = payload.get(*k) {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            let cleaned = clean_text(&s);
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
    }
    None
}

fn num_field(payload: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for k in keys {
        match payload.get(*k) {
            Some(serde_json::Value::Number(n)) => return n.as_f64(),
            Some(serde_json::Value::String(s)) => {
                if let Ok(f) = s.trim().parse::<f64>() {
                    return Some(f);
                }
            }
            _ => {}
        }
    }
    None
}

/// Timestamps arrive in several shapes (RFC 3339, RFC 2822, bare dates).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s.trim(), fmt) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }
    None
}

fn extract_codes(payload: &serde_json::Value) -> Vec<String> {
    if let Some(serde_json::Value::Array(arr)) = payload
        .get("cpt_codes")
        .or_else(|| payload.get("affected_codes"))
    {
        return arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(code) = str_field(payload, &["cpt_code", "code"]) {
        return vec![code];
    }
    Vec::new()
}

fn extract_rate_delta(payload: &serde_json::Value) -> Option<RateDelta> {
    if let (Some(old), Some(new)) = (
        num_field(payload, &["old_rate"]),
        num_field(payload, &["new_rate"]),
    ) {
        return Some(RateDelta { old, new });
    }
    if let Some(delta) = payload.get("delta") {
        if let (Some(old), Some(new)) = (num_field(delta, &["old"]), num_field(delta, &["new"])) {
            return Some(RateDelta { old, new });
        }
    }
    None
}

/// Stable fallback id for sources that ship no usable identifier.
fn synthetic_id(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("gen-{hex}")
}

/// Reduce a raw record to the canonical shape. Never fails, never drops.
pub fn normalize(raw: &RawSourceRecord, ingested_at: DateTime<Utc>) -> NormalizedEvent {
    let payload = &raw.payload;

    let source_record_id = str_field(payload, &["recall_number", "id", "source_id", "document_number"])
        .unwrap_or_else(|| synthetic_id(payload));

    let title = str_field(
        payload,
        &["title", "product_description", "device_name", "description"],
    )
    .unwrap_or_else(|| format!("{} record {}", raw.source_tag, source_record_id));

    let description = str_field(
        payload,
        &["reason_for_recall", "reason", "summary", "description", "impact"],
    )
    .unwrap_or_default();

    let occurred_at = str_field(
        payload,
        &["report_date", "publication_date", "effective_date", "date", "published_at"],
    )
    .and_then(|s| parse_timestamp(&s))
    .unwrap_or(ingested_at);

    let vendor_advisory = raw.source_tag.eq_ignore_ascii_case("vendor-advisory")
        || payload
            .get("type")
            .and_then(|v| v.as_str())
            .is_some_and(|t| t == "vendor_advisory");

    NormalizedEvent {
        source_tag: raw.source_tag.clone(),
        source_record_id,
        title,
        description,
        occurred_at,
        classification_tag: str_field(payload, &["classification", "severity", "risk_class"]),
        manufacturer: str_field(payload, &["recalling_firm", "manufacturer", "vendor"]),
        device_descriptor: str_field(payload, &["model", "device_name", "product_description"]),
        affected_codes: extract_codes(payload),
        rate_delta: extract_rate_delta(payload),
        jurisdiction_tag: str_field(
            payload,
            &["state", "distribution_pattern", "locality", "region"],
        ),
        vendor_advisory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn clean_text_collapses_ws_and_strips_tags() {
        let s = "  <b>Hello&nbsp;&nbsp;world</b> &ldquo;ok&rdquo; ";
        assert_eq!(clean_text(s), r#"Hello world "ok""#);
    }

    #[test]
    fn normalize_full_recall_record() {
        let raw = RawSourceRecord::new(
            "fda-device-recall",
            json!({
                "recall_number": "Z-1234-2025",
                "product_description": "CT Scanner Revolution Series",
                "classification": "Class II",
                "reason_for_recall": "Software malfunction affecting image quality",
                "recalling_firm": "GE Healthcare",
                "model": "Revolution CT",
                "state": "CA",
                "report_date": "2025-07-15"
            }),
        );
        let ev = normalize(&raw, at());
        assert_eq!(ev.source_record_id, "Z-1234-2025");
        assert_eq!(ev.title, "CT Scanner Revolution Series");
        assert_eq!(ev.classification_tag.as_deref(), Some("Class II"));
        assert_eq!(ev.manufacturer.as_deref(), Some("GE Healthcare"));
        assert_eq!(ev.device_descriptor.as_deref(), Some("Revolution CT"));
        assert_eq!(ev.jurisdiction_tag.as_deref(), Some("CA"));
        assert_eq!(ev.occurred_at.to_rfc3339(), "2025-07-15T00:00:00+00:00");
        assert!(!ev.vendor_advisory);
    }

    #[test]
    fn normalize_rate_change_record() {
        let raw = RawSourceRecord::new(
            "cms-pfs",
            json!({
                "id": "CMS-2025-001",
                "cpt_code": "70553",
                "description": "Brain MRI with contrast",
                "old_rate": 296.65,
                "new_rate": 308.12,
                "locality": "California"
            }),
        );
        let ev = normalize(&raw, at());
        assert_eq!(ev.affected_codes, vec!["70553".to_string()]);
        let d = ev.rate_delta.expect("delta");
        assert!((d.old - 296.65).abs() < 1e-9);
        assert_eq!(ev.jurisdiction_tag.as_deref(), Some("California"));
    }

    #[test]
    fn normalize_is_total_on_garbage() {
        // Empty object: everything defaulted, nothing panics.
        let raw = RawSourceRecord::new("payer-bulletin", json!({}));
        let ev = normalize(&raw, at());
        assert!(!ev.title.is_empty());
        assert!(ev.source_record_id.starts_with("gen-"));
        assert_eq!(ev.occurred_at, at());

        // Non-object payloads are equally fine.
        let raw = RawSourceRecord::new("payer-bulletin", json!(null));
        let ev = normalize(&raw, at());
        assert!(!ev.title.is_empty());

        let raw = RawSourceRecord::new("payer-bulletin", json!([1, 2, 3]));
        let ev = normalize(&raw, at());
        assert!(!ev.title.is_empty());
    }

    #[test]
    fn synthetic_id_is_deterministic() {
        let a = RawSourceRecord::new("mbc", json!({"x": 1}));
        let b = RawSourceRecord::new("mbc", json!({"x": 1}));
        assert_eq!(
            normalize(&a, at()).source_record_id,
            normalize(&b, at()).source_record_id
        );
    }

    #[test]
    fn vendor_advisory_flag_from_tag_and_type() {
        let raw = RawSourceRecord::new("vendor-advisory", json!({"title": "Patch"}));
        assert!(normalize(&raw, at()).vendor_advisory);

        let raw = RawSourceRecord::new("cdph", json!({"title": "x", "type": "vendor_advisory"}));
        assert!(normalize(&raw, at()).vendor_advisory);
    }
}
