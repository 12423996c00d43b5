//! Operational HTTP surface: health, engine status, recent alerts and a
//! manual cycle trigger. The product UI and its CRUD live elsewhere;
//! this router exists for operators and smoke tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::event::ScoredEvent;
use crate::ingest::types::SourceAdapter;
use crate::pipeline::{CycleStats, EngineStatus, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/status", get(status))
        .route("/api/alerts/recent", get(recent_alerts))
        .route("/api/cycle/run", post(run_cycle))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.pipeline.status().await)
}

async fn recent_alerts(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<ScoredEvent>> {
    let n = q
        .get("n")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20)
        .min(200);
    Json(state.pipeline.store().recent(n).await)
}

async fn run_cycle(State(state): State<AppState>) -> Json<CycleStats> {
    let stats = state.pipeline.run_cycle(&state.adapters).await;
    Json(stats)
}
