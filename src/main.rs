//! Radwatch service entrypoint.
//! Boots the pipeline scheduler and the operational Axum API, wiring
//! adapters, shared state, and middleware.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use radwatch::api::{create_router, AppState};
use radwatch::config::EngineConfig;
use radwatch::enrich::{build_summarizer, load_enrich_config};
use radwatch::ingest::config::load_sources_default;
use radwatch::ingest::providers::{
    cms_pfs::CmsPfsAdapter, federal_register::FederalRegisterAdapter, openfda::OpenFdaAdapter,
};
use radwatch::ingest::types::SourceAdapter;
use radwatch::metrics::Metrics;
use radwatch::notify::NotifierMux;
use radwatch::pipeline::{spawn_digest_task, spawn_scheduler, Pipeline};
use radwatch::store::MemoryStore;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("radwatch=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Live adapters when RADWATCH_LIVE=1, embedded fixtures otherwise so a
/// bare checkout produces deterministic output.
fn build_adapters() -> Vec<Arc<dyn SourceAdapter>> {
    let live = std::env::var("RADWATCH_LIVE")
        .map(|v| v == "1")
        .unwrap_or(false);

    if live {
        vec![
            Arc::new(OpenFdaAdapter::from_url(
                "https://api.fda.gov/device/enforcement.json?search=classification:(Class+I+OR+Class+II)&limit=100",
            )),
            Arc::new(CmsPfsAdapter::from_url(
                std::env::var("CMS_PFS_URL").unwrap_or_default(),
            )),
            Arc::new(FederalRegisterAdapter::from_url(
                "https://www.federalregister.gov/documents/search.rss?conditions%5Bterm%5D=radiology",
            )),
        ]
    } else {
        vec![
            Arc::new(OpenFdaAdapter::from_fixture_str(include_str!(
                "../tests/fixtures/openfda_enforcement.json"
            ))),
            Arc::new(CmsPfsAdapter::from_fixture_str(include_str!(
                "../tests/fixtures/cms_pfs.json"
            ))),
            Arc::new(FederalRegisterAdapter::from_fixture_str(include_str!(
                "../tests/fixtures/federal_register.xml"
            ))),
        ]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::load_default();
    let metrics = Metrics::init(cfg.dedup_window_days);

    let summarizer = build_summarizer(&load_enrich_config());
    let notifiers = NotifierMux::from_env();
    if notifiers.is_empty() {
        tracing::warn!("no notification senders configured; alerts will only be persisted");
    }

    let known_sources = load_sources_default()?;
    let store = Arc::new(MemoryStore::new());
    let pipeline = Arc::new(Pipeline::new(
        &cfg,
        summarizer,
        notifiers,
        store.clone(),
        known_sources,
    ));

    let adapters = build_adapters();
    spawn_scheduler(pipeline.clone(), adapters.clone(), cfg.poll_interval_secs);
    spawn_digest_task(pipeline.clone(), cfg.digest_interval_secs);

    // Hourly best-effort snapshot of the event log.
    {
        let store = store.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                if let Err(e) = store.snapshot_to_json("state/events.json").await {
                    tracing::warn!(error = ?e, "event log snapshot failed");
                }
            }
        });
    }

    let state = AppState { pipeline, adapters };
    let app = create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "radwatch listening");
    axum::serve(listener, app).await?;
    Ok(())
}
