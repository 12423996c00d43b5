use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};

use crate::event::RawSourceRecord;
use crate::ingest::json_results;
use crate::ingest::types::SourceAdapter;

pub const SOURCE_TAG: &str = "fda-device-recall";

/// openFDA device enforcement adapter. Fixture mode feeds embedded JSON
/// for tests and local runs; HTTP mode hits the live endpoint.
pub struct OpenFdaAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl OpenFdaAdapter {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    fn parse_records(body: &str) -> Result<Vec<RawSourceRecord>> {
        let t0 = std::time::Instant::now();
        let results = json_results(body).context("parsing openFDA enforcement json")?;

        let out: Vec<RawSourceRecord> = results
            .into_iter()
            .filter(|v| v.is_object())
            .map(|payload| RawSourceRecord::new(SOURCE_TAG, payload))
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for OpenFdaAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawSourceRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_records(s),
            Mode::Http { url, client } => {
                let body = match client.get(url).send().await {
                    Ok(resp) => resp.text().await.context("openfda http .text()")?,
                    Err(e) => {
                        tracing::warn!(error = ?e, adapter = SOURCE_TAG, "adapter http error");
                        counter!("ingest_adapter_errors_total").increment(1);
                        return Err(e).context("openfda http get()");
                    }
                };
                Self::parse_records(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_TAG
    }
}
