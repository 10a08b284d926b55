// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only view over the latest batch. All endpoints live under `/api/v1/`.
//
// CORS is configured permissively; the service is meant for a local
// dashboard.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::app_state::AppState;
use crate::enrich::enrich;
use crate::features::build_features;
use crate::snapshot::MarketSnapshot;
use crate::summary::summarise;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshots", get(snapshots))
        .route("/api/v1/snapshots/:symbol", get(snapshot))
        .route("/api/v1/snapshots/:symbol/summary", get(snapshot_summary))
        .route("/api/v1/failures", get(failures))
        .route("/api/v1/momentum", get(momentum))
        .route("/api/v1/features/:symbol", get(features))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// 404 for unknown symbols, 422 when the last batch failed on it.
fn missing_snapshot(state: &AppState, symbol: &str) -> Response {
    match state.failures.read().get(symbol) {
        Some(f) => error_response(StatusCode::UNPROCESSABLE_ENTITY, f.message.clone()),
        None => error_response(StatusCode::NOT_FOUND, format!("no snapshot for {symbol}")),
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    instruments: usize,
    snapshots: usize,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        instruments: state.series.read().len(),
        snapshots: state.snapshots.read().len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Snapshots
// =============================================================================

async fn snapshots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let all: Vec<MarketSnapshot> = state.all_snapshots().iter().map(|s| (**s).clone()).collect();
    Json(all)
}

async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    let symbol = symbol.to_uppercase();
    match state.snapshot(&symbol) {
        Some(s) => Json((*s).clone()).into_response(),
        None => missing_snapshot(&state, &symbol),
    }
}

async fn snapshot_summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    let symbol = symbol.to_uppercase();
    match state.snapshot(&symbol) {
        Some(s) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            summarise(&s),
        )
            .into_response(),
        None => missing_snapshot(&state, &symbol),
    }
}

async fn failures(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.all_failures())
}

// =============================================================================
// Momentum
// =============================================================================

async fn momentum(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ranking = state.momentum.read().clone();
    Json(ranking)
}

// =============================================================================
// Features (computed on request)
// =============================================================================

async fn features(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    let symbol = symbol.to_uppercase();
    let Some(series) = state.series_for(&symbol) else {
        return error_response(StatusCode::NOT_FOUND, format!("unknown symbol {symbol}"));
    };
    let (as_of, indicators) = {
        let config = state.runtime_config.read();
        (config.as_of, config.analysis.indicators.clone())
    };

    let task = tokio::task::spawn_blocking(move || {
        let history = match as_of {
            Some(date) => series.truncated_at(date)?,
            None => (*series).clone(),
        };
        enrich(&history, &indicators).map(|e| build_features(&e))
    });

    match task.await {
        Ok(Ok(rows)) => Json(rows).into_response(),
        Ok(Err(e)) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "feature task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "feature computation failed")
        }
    }
}
