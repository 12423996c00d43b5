use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::json;

use crate::event::RawSourceRecord;
use crate::ingest::types::SourceAdapter;

pub const SOURCE_TAG: &str = "federal-register";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    guid: Option<String>,
}

/// Federal Register rule-making notices via RSS.
pub struct FederalRegisterAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FederalRegisterAdapter {
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

    fn parse_items_from_str(s: &str) -> Result<Vec<RawSourceRecord>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing federal register rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            if it.title.as_deref().unwrap_or_default().is_empty() {
                continue;
            }
            out.push(RawSourceRecord::new(
                SOURCE_TAG,
                json!({
                    "id": it.guid.or_else(|| it.link.clone()),
                    "title": it.title,
                    "summary": it.description,
                    "publication_date": it.pub_date,
                    "url": it.link,
                }),
            ));
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for FederalRegisterAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawSourceRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = match client.get(url).send().await {
                    Ok(resp) => resp.text().await.context("federal register http .text()")?,
                    Err(e) => {
                        tracing::warn!(error = ?e, adapter = SOURCE_TAG, "adapter http error");
                        counter!("ingest_adapter_errors_total").increment(1);
                        return Err(e).context("federal register http get()");
                    }
                };
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_TAG
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
