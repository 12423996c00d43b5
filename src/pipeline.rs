//! # Pipeline Orchestrator
//! Drives records from normalization through scoring, dedup, optional
//! enrichment, routing and persistence. The orchestrator is the only
//! component aware of concurrency: sources ingest in parallel (one
//! worker per adapter), while the signature table and quota governor are
//! shared state synchronized inside their own types.
//!
//! Locks are held only for in-memory decisions; enrichment and
//! notification I/O always run after the locks are released, under
//! bounded timeouts. A bad record or failed collaborator never aborts
//! the rest of a batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::dedup::{EventSignature, SignatureTable};
use crate::enrich::{rule_based_summary, DynSummarizer};
use crate::event::{Category, RawSourceRecord, ScoredEvent};
use crate::ingest::{self, config::is_known_source, types::SourceAdapter};
use crate::normalize::normalize;
use crate::notify::{AlertMessage, NotifierMux};
use crate::quota::{QuotaGovernor, QuotaStatus};
use crate::routing::{decide_routing, Channel, ContentVariant, NotificationPlan};
use crate::score::{strategy_for, ScoringContext, ScoringStrategy};
use crate::store::EventStore;

/// Upper bound on a single enrichment call.
const ENRICH_TIMEOUT: Duration = Duration::from_secs(8);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_produced_total", "Events scored, deduped and persisted.");
        describe_counter!("pipeline_dedup_total", "Events dropped by the signature window.");
        describe_counter!(
            "pipeline_suppressed_total",
            "Events categorized Suppressed (persisted, never surfaced)."
        );
        describe_counter!("pipeline_notified_total", "Immediate notifications dispatched.");
        describe_counter!(
            "pipeline_enrich_fallback_total",
            "Notifications that used the rule-based summary."
        );
        describe_counter!("ingest_records_total", "Raw records fetched from adapters.");
        describe_counter!("ingest_adapter_errors_total", "Adapter fetch/parse errors.");
        describe_counter!("ingest_events_total", "Records parsed by adapters.");
        describe_counter!("notify_sent_total", "Successful notification sends.");
        describe_counter!("notify_failed_total", "Failed or timed-out notification sends.");
        describe_histogram!("ingest_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!("pipeline_last_cycle_ts", "Unix ts when the pipeline last ran.");
    });
}

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Notified,
    Digested,
    Suppressed,
    Duplicate,
}

/// Aggregated counts for one pipeline cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleStats {
    pub fetched: usize,
    pub produced: usize,
    pub deduped: usize,
    pub suppressed: usize,
    pub digested: usize,
    pub notified: usize,
}

impl CycleStats {
    fn absorb(&mut self, other: CycleStats) {
        self.fetched += other.fetched;
        self.produced += other.produced;
        self.deduped += other.deduped;
        self.suppressed += other.suppressed;
        self.digested += other.digested;
        self.notified += other.notified;
    }
}

/// Status snapshot for the operational API.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub scoring_strategy: &'static str,
    pub quota: QuotaStatus,
    pub events_stored: usize,
    pub signatures_tracked: usize,
    pub dedup_window_days: i64,
    pub last_cycle_ts: Option<DateTime<Utc>>,
}

/// Owns every piece of shared mutable state the engine needs. Explicitly
/// constructed and injected; no module-level singletons.
pub struct Pipeline {
    strategy: Box<dyn ScoringStrategy>,
    base_ctx: ScoringContext,
    signatures: SignatureTable,
    quota: QuotaGovernor,
    store: Arc<dyn EventStore>,
    summarizer: DynSummarizer,
    notifiers: NotifierMux,
    sms_opt_in: bool,
    known_sources: Vec<String>,
    last_cycle: Mutex<Option<DateTime<Utc>>>,
}

impl Pipeline {
    pub fn new(
        cfg: &EngineConfig,
        summarizer: DynSummarizer,
        notifiers: NotifierMux,
        store: Arc<dyn EventStore>,
        known_sources: Vec<String>,
    ) -> Self {
        Self {
            strategy: strategy_for(cfg.scoring_mode),
            base_ctx: ScoringContext {
                target_jurisdiction: cfg.target_jurisdiction.clone(),
                adjacent_regions: cfg.adjacent_regions.clone(),
                tracked_devices: cfg.tracked_devices.clone(),
                tracked_codes: cfg.tracked_codes.clone(),
                ..ScoringContext::default()
            },
            signatures: SignatureTable::with_window_days(cfg.dedup_window_days),
            quota: QuotaGovernor::new(cfg.daily_enrichment_limit),
            store,
            summarizer,
            notifiers,
            sms_opt_in: cfg.sms_opt_in,
            known_sources,
            last_cycle: Mutex::new(None),
        }
    }

    pub fn quota(&self) -> &QuotaGovernor {
        &self.quota
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            scoring_strategy: self.strategy.name(),
            quota: self.quota.status(Utc::now()),
            events_stored: self.store.event_count().await,
            signatures_tracked: self.signatures.len(),
            dedup_window_days: self.signatures.window_days(),
            last_cycle_ts: *self.last_cycle.lock().expect("last cycle mutex poisoned"),
        }
    }

    /// Run one full cycle: fetch every adapter in parallel, process each
    /// source's batch in arrival order, return merged stats.
    pub async fn run_cycle(
        self: &Arc<Self>,
        adapters: &[Arc<dyn SourceAdapter>],
    ) -> CycleStats {
        ensure_metrics_described();

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let me = Arc::clone(self);
            let adapter = Arc::clone(adapter);
            handles.push(tokio::spawn(async move {
                me.process_source(adapter.as_ref()).await
            }));
        }

        let mut total = CycleStats::default();
        for handle in handles {
            match handle.await {
                Ok(stats) => total.absorb(stats),
                Err(e) => tracing::warn!(error = ?e, "source worker panicked"),
            }
        }

        let now = Utc::now();
        gauge!("pipeline_last_cycle_ts").set(now.timestamp() as f64);
        *self.last_cycle.lock().expect("last cycle mutex poisoned") = Some(now);

        tracing::info!(
            fetched = total.fetched,
            produced = total.produced,
            deduped = total.deduped,
            notified = total.notified,
            "pipeline cycle complete"
        );
        total
    }

    async fn process_source(&self, adapter: &dyn SourceAdapter) -> CycleStats {
        let raw_records = ingest::fetch_source(adapter).await;
        let mut stats = CycleStats {
            fetched: raw_records.len(),
            ..CycleStats::default()
        };

        // Within one source, records are processed in arrival order.
        for raw in raw_records {
            match self.process_record(raw).await {
                RecordOutcome::Notified => {
                    stats.produced += 1;
                    stats.notified += 1;
                }
                RecordOutcome::Digested => {
                    stats.produced += 1;
                    stats.digested += 1;
                }
                RecordOutcome::Suppressed => {
                    stats.produced += 1;
                    stats.suppressed += 1;
                }
                RecordOutcome::Duplicate => stats.deduped += 1,
            }
        }
        stats
    }

    /// Normalize → score → dedup → route → (enrich) → persist → notify.
    pub async fn process_record(&self, raw: RawSourceRecord) -> RecordOutcome {
        let now = Utc::now();

        if !is_known_source(&raw.source_tag, &self.known_sources) {
            tracing::debug!(source = %raw.source_tag, "record from unlisted source");
        }

        let event = normalize(&raw, now);
        let scored = self.strategy.score(&event, &self.base_ctx);

        // Atomic check-and-record under the table lock; duplicates are
        // silently dropped before persistence and before notification.
        let sig = EventSignature::of_event(&scored.event);
        if self.signatures.check_and_record(&sig, now) {
            counter!("pipeline_dedup_total").increment(1);
            tracing::debug!(
                source = %scored.event.source_tag,
                id = %scored.event.source_record_id,
                "duplicate inside window, dropped"
            );
            return RecordOutcome::Duplicate;
        }

        let plan = decide_routing(&scored, &self.quota, now, self.sms_opt_in);

        // The event is "produced" once scored and deduped: persist
        // before any delivery attempt.
        if let Err(e) = self.store.append_event(scored.clone()).await {
            tracing::warn!(error = ?e, "event append failed");
        }
        counter!("pipeline_produced_total").increment(1);

        match scored.category {
            Category::Suppressed => {
                counter!("pipeline_suppressed_total").increment(1);
                RecordOutcome::Suppressed
            }
            Category::Digest => {
                if let Err(e) = self.store.enqueue_digest(scored.clone()).await {
                    tracing::warn!(error = ?e, "digest enqueue failed");
                }
                RecordOutcome::Digested
            }
            _ => {
                let body = self.resolve_content(&scored, &plan).await;
                let msg = AlertMessage {
                    title: scored.event.title.clone(),
                    body,
                    category: scored.category,
                    source_tag: scored.event.source_tag.clone(),
                    ts: now,
                };
                let sent = self.notifiers.dispatch(&plan, &msg).await;
                counter!("pipeline_notified_total").increment(sent as u64);
                RecordOutcome::Notified
            }
        }
    }

    /// Content for an immediate notification. Enrichment runs only when
    /// the quota granted a unit, under a bounded timeout, and any failure
    /// falls back to the deterministic rule-based summary; an Urgent
    /// notification is never blocked on enrichment.
    async fn resolve_content(&self, scored: &ScoredEvent, plan: &NotificationPlan) -> String {
        if plan.enrichment_granted {
            let attempt = tokio::time::timeout(
                ENRICH_TIMEOUT,
                self.summarizer.summarize(
                    &scored.event.title,
                    &scored.event.description,
                    scored.category,
                ),
            )
            .await;
            match attempt {
                Ok(Some(summary)) if !summary.is_empty() => return summary,
                Ok(_) => tracing::debug!(
                    provider = self.summarizer.provider_name(),
                    "enrichment returned nothing, falling back"
                ),
                Err(_) => tracing::warn!(
                    provider = self.summarizer.provider_name(),
                    "enrichment timed out, falling back"
                ),
            }
        }
        counter!("pipeline_enrich_fallback_total").increment(1);
        rule_based_summary(&scored.event, scored.category)
    }

    /// Send the pending digest batch as one summary email. Returns the
    /// number of events included (0 when the queue was empty).
    pub async fn flush_digest(&self) -> usize {
        let mut batch = self.store.drain_digest().await;
        if batch.is_empty() {
            return 0;
        }
        batch.sort_by_key(|e| e.category.rank());

        let mut lines = vec![format!("{} queued updates:", batch.len())];
        for ev in &batch {
            lines.push(format!(
                "- [{}] {} ({})",
                ev.score, ev.event.title, ev.event.source_tag
            ));
        }

        let plan = NotificationPlan {
            channels: vec![Channel::Email],
            content_variant: ContentVariant::DigestTemplate,
            enrichment_granted: false,
        };
        let msg = AlertMessage {
            title: format!("Daily digest: {} updates", batch.len()),
            body: lines.join("\n"),
            category: Category::Digest,
            source_tag: "digest".to_string(),
            ts: Utc::now(),
        };
        self.notifiers.dispatch(&plan, &msg).await;
        batch.len()
    }
}

/// Interval-driven cycles. The returned handle can be aborted at shutdown.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let stats = pipeline.run_cycle(&adapters).await;
            tracing::info!(target: "scheduler", fetched = stats.fetched, "scheduled cycle done");
        }
    })
}

/// Periodic digest flush (daily by default).
pub fn spawn_digest_task(pipeline: Arc<Pipeline>, period_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(period_secs);
        loop {
            tokio::time::sleep(period).await;
            let flushed = pipeline.flush_digest().await;
            if flushed > 0 {
                tracing::info!(target: "scheduler", flushed, "digest flushed");
            }
        }
    })
}
