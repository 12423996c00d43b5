// tests/normalize_total.rs
// The normalizer is total: adapters can hand the pipeline arbitrary
// payload shapes and nothing panics or gets discarded before scoring.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use radwatch::config::EngineConfig;
use radwatch::enrich::DisabledSummarizer;
use radwatch::event::RawSourceRecord;
use radwatch::ingest::config::default_known_sources;
use radwatch::ingest::types::SourceAdapter;
use radwatch::normalize::normalize;
use radwatch::notify::NotifierMux;
use radwatch::pipeline::Pipeline;
use radwatch::store::MemoryStore;
use serde_json::json;

struct JunkAdapter;

#[async_trait]
impl SourceAdapter for JunkAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawSourceRecord>> {
        Ok(vec![
            RawSourceRecord::new("cdph", json!(null)),
            RawSourceRecord::new("cdph", json!([1, 2, 3])),
            RawSourceRecord::new("cdph", json!({"unexpected": {"deeply": {"nested": true}}})),
            RawSourceRecord::new("totally-unknown-feed", json!({"title": 42})),
            RawSourceRecord::new("cdph", json!({"description": "x".repeat(100_000)})),
        ])
    }
    fn name(&self) -> &'static str {
        "junk"
    }
}

#[test]
fn normalize_never_panics_on_arbitrary_shapes() {
    let now = Utc::now();
    for payload in [
        json!(null),
        json!(true),
        json!(12.5),
        json!(""),
        json!([]),
        json!({}),
        json!({"title": null, "state": 9, "delta": {"old": "not-a-number"}}),
    ] {
        let raw = RawSourceRecord::new("rhb", payload);
        let ev = normalize(&raw, now);
        assert!(!ev.title.is_empty());
        assert!(!ev.source_record_id.is_empty());
    }
}

#[tokio::test]
async fn junk_batch_flows_through_the_whole_pipeline() {
    let cfg = EngineConfig::default();
    let pipeline = Arc::new(Pipeline::new(
        &cfg,
        Arc::new(DisabledSummarizer),
        NotifierMux::new(),
        Arc::new(MemoryStore::new()),
        default_known_sources(),
    ));

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(JunkAdapter)];
    let stats = pipeline.run_cycle(&adapters).await;

    assert_eq!(stats.fetched, 5);
    // Every record is either produced or collapsed by the signature
    // window (identity-free records share one signature); none are lost.
    assert_eq!(stats.produced + stats.deduped, 5);
    assert!(stats.produced >= 1);
    assert_eq!(
        pipeline.store().event_count().await,
        stats.produced
    );
}
