//! Enrichment adapter: provider abstraction for the external
//! text-summarization capability, plus the deterministic rule-based
//! fallback used whenever enrichment is denied, disabled, or failing.
//!
//! The quota check happens in the pipeline *before* a provider is
//! invoked; providers themselves are quota-unaware. Failure is modeled
//! as `None`, never an error that could stall routing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::event::{Category, NormalizedEvent};

/// External summarization capability. Implementations must be cheap to
/// share and must never panic on provider failure.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a short operational summary, or `None` on any failure.
    async fn summarize(&self, title: &str, description: &str, category: Category)
        -> Option<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Enrichment config, loaded from `config/enrich.json` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    pub enabled: bool,
    /// "perplexity" is the only real provider wired today.
    pub provider: Option<String>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
        }
    }
}

pub fn load_enrich_config() -> EnrichConfig {
    match std::fs::read_to_string("config/enrich.json") {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => EnrichConfig::default(),
    }
}

/// Factory: build a summarizer from config and environment.
///
/// * `ENRICH_TEST_MODE=mock` forces the deterministic mock client.
/// * A disabled config yields a client that always returns `None`.
pub fn build_summarizer(config: &EnrichConfig) -> DynSummarizer {
    if std::env::var("ENRICH_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockSummarizer {
            fixed: "Deterministic mock summary.".to_string(),
        });
    }

    if !config.enabled {
        return Arc::new(DisabledSummarizer);
    }

    match config.provider.as_deref() {
        Some("perplexity") => Arc::new(PerplexitySummarizer::from_env()),
        _ => Arc::new(DisabledSummarizer),
    }
}

/// Always `None`; used when enrichment is switched off.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _t: &str, _d: &str, _c: Category) -> Option<String> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-output summarizer for tests and local runs.
#[derive(Clone)]
pub struct MockSummarizer {
    pub fixed: String,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _t: &str, _d: &str, _c: Category) -> Option<String> {
        Some(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Perplexity chat-completions provider. Requires `PERPLEXITY_API_KEY`.
pub struct PerplexitySummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl PerplexitySummarizer {
    pub fn from_env() -> Self {
        let api_key = std::env::var("PERPLEXITY_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("radwatch/0.1 (+github.com/radwatch/radwatch)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: "llama-3.1-sonar-small-128k-online".to_string(),
        }
    }
}

#[async_trait]
impl Summarizer for PerplexitySummarizer {
    async fn summarize(
        &self,
        title: &str,
        description: &str,
        category: Category,
    ) -> Option<String> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "You are a medical regulatory expert. Provide concise, actionable summaries \
                   for radiology clinic staff. Focus on operational impact and required actions. \
                   Maximum 2 sentences.";
        let user = format!("Summarize this {category:?} alert for clinic operations:\n\n{title}\n{description}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 100,
        };

        let resp = self
            .http
            .post("https://api.perplexity.ai/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        let cleaned = sanitize_summary(content);
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn provider_name(&self) -> &'static str {
        "perplexity"
    }
}

/// Ensure ASCII-only, single line, <=240 chars. Collapses whitespace.
pub fn sanitize_summary(input: &str) -> String {
    let mut out = String::with_capacity(240);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 240 {
            break;
        }
    }
    out.trim().to_string()
}

/// Deterministic non-AI summary. Always non-empty (the title is
/// guaranteed non-empty by the normalizer), so routing can rely on it
/// when quota is exhausted or the provider fails.
pub fn rule_based_summary(event: &NormalizedEvent, category: Category) -> String {
    let mut parts = vec![format!("{:?}: {}", category, event.title)];

    if let Some(class) = &event.classification_tag {
        parts.push(format!("Classification {class}"));
    }
    if !event.affected_codes.is_empty() {
        parts.push(format!("Affected codes {}", event.affected_codes.join(", ")));
    }
    if let Some(delta) = &event.rate_delta {
        parts.push(format!("Rate change {:+.1}%", delta.percent_change()));
    }
    if !event.description.is_empty() {
        let snippet: String = event.description.chars().take(160).collect();
        parts.push(snippet);
    }

    sanitize_summary(&parts.join(". "))
}
