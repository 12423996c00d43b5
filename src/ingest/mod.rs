// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use anyhow::Result;
use metrics::counter;

use crate::event::RawSourceRecord;
use types::SourceAdapter;

/// Fetch one batch from a single adapter, mapping fetch errors to an
/// empty batch so one unreachable source never fails a cycle.
pub async fn fetch_source(adapter: &dyn SourceAdapter) -> Vec<RawSourceRecord> {
    match adapter.fetch_latest().await {
        Ok(records) => {
            counter!("ingest_records_total").increment(records.len() as u64);
            records
        }
        Err(e) => {
            tracing::warn!(error = ?e, adapter = adapter.name(), "adapter error");
            counter!("ingest_adapter_errors_total").increment(1);
            Vec::new()
        }
    }
}

/// Parse helper shared by the JSON adapters: unwrap an openFDA-style
/// `{ "results": [...] }` envelope, or accept a bare array.
pub(crate) fn json_results(body: &str) -> Result<Vec<serde_json::Value>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let arr = match value {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(mut obj) => match obj.remove("results") {
            Some(serde_json::Value::Array(arr)) => arr,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_results_accepts_envelope_and_bare_array() {
        let enveloped = r#"{"meta": {}, "results": [{"a": 1}, {"a": 2}]}"#;
        assert_eq!(json_results(enveloped).unwrap().len(), 2);

        let bare = r#"[{"a": 1}]"#;
        assert_eq!(json_results(bare).unwrap().len(), 1);

        let neither = r#"{"meta": {}}"#;
        assert!(json_results(neither).unwrap().is_empty());
    }
}
