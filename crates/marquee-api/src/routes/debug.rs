//! `GET /debug/metrics`: request counters as JSON.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Build the debug router.
pub fn router() -> Router<AppState> {
    Router::new().route("/debug/metrics", get(metrics))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
