// src/ingest/types.rs
use anyhow::Result;

pub use crate::event::RawSourceRecord;

/// Per-source fetcher. HTTP retry/backoff mechanics live behind this
/// boundary; the engine only sees raw records.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawSourceRecord>>;
    fn name(&self) -> &'static str;
}
