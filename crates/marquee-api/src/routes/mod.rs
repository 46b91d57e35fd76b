//! # API Route Modules
//!
//! - `healthcheck`: liveness and deployment info, open to anonymous callers.
//! - `users`: the caller's own account, authenticated callers only.
//! - `debug`: in-process request counters.
//!
//! Also holds the two routing-level error handlers shared by every route:
//! the JSON 404 fallback and the JSON rewrite of axum's bare 405.

pub mod debug;
pub mod healthcheck;
pub mod users;

use axum::extract::Request;
use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Every route the server exposes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(healthcheck::router())
        .merge(users::router())
        .merge(debug::router())
}

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Replace axum's empty 405 with the JSON error body, keeping its `Allow`
/// header.
pub async fn method_not_allowed(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;

    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let mut rewritten = AppError::MethodNotAllowed(method).into_response();
    if let Some(allow) = allow {
        rewritten.headers_mut().insert(ALLOW, allow);
    }
    rewritten
}
