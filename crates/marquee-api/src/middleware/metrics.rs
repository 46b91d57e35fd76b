//! # Request Metrics
//!
//! Lightweight request metrics using atomic counters, exposed as JSON at
//! `GET /debug/metrics`.
//!
//! Mounted outside the panic guard, so a panic converted to 500 is still
//! counted as a response sent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use serde::Serialize;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    requests_received: Arc<AtomicU64>,
    responses_sent: Arc<AtomicU64>,
    processing_time_us: Arc<AtomicU64>,
    responses_by_status: Arc<Mutex<BTreeMap<u16, u64>>>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests_received: u64,
    pub total_responses_sent: u64,
    pub total_processing_time_us: u64,
    pub in_flight_requests: u64,
    pub total_responses_sent_by_status: BTreeMap<u16, u64>,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_response(&self, status: u16, started: Instant) {
        let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
        self.processing_time_us.fetch_add(elapsed, Ordering::Relaxed);
        *self.responses_by_status.lock().entry(status).or_insert(0) += 1;
    }

    /// Copy out every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let received = self.requests_received.load(Ordering::Relaxed);
        let sent = self.responses_sent.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests_received: received,
            total_responses_sent: sent,
            total_processing_time_us: self.processing_time_us.load(Ordering::Relaxed),
            in_flight_requests: received.saturating_sub(sent),
            total_responses_sent_by_status: self.responses_by_status.lock().clone(),
        }
    }
}

/// Middleware that counts requests, responses and processing time.
pub async fn metrics_middleware(
    State(metrics): State<ApiMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    metrics.requests_received.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    metrics.record_response(response.status().as_u16(), started);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_app(metrics: ApiMetrics) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(from_fn_with_state(metrics, metrics_middleware))
    }

    async fn hit(app: Router, path: &str) {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
    }

    #[test]
    fn fresh_metrics_are_zero() {
        let snapshot = ApiMetrics::new().snapshot();
        assert_eq!(snapshot.total_requests_received, 0);
        assert_eq!(snapshot.total_responses_sent, 0);
        assert!(snapshot.total_responses_sent_by_status.is_empty());
    }

    #[tokio::test]
    async fn counts_requests_and_statuses() {
        let metrics = ApiMetrics::new();
        let app = test_app(metrics.clone());
        hit(app.clone(), "/ok").await;
        hit(app.clone(), "/ok").await;
        hit(app.clone(), "/teapot").await;
        hit(app, "/missing").await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests_received, 4);
        assert_eq!(snapshot.total_responses_sent, 4);
        assert_eq!(snapshot.in_flight_requests, 0);
        assert_eq!(
            snapshot.total_responses_sent_by_status,
            BTreeMap::from([(200, 2), (404, 1), (418, 1)])
        );
    }

    #[test]
    fn snapshot_serializes_status_keys_as_strings() {
        let metrics = ApiMetrics::new();
        metrics.record_response(429, Instant::now());
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["total_responses_sent_by_status"]["429"], 1);
    }
}
