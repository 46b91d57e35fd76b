//! # marquee-api: Request Gate for the Marquee API
//!
//! An axum pipeline that every request crosses before reaching a handler:
//! panic recovery, per-client rate limiting, bearer-token authentication,
//! and per-route activation/permission guards.
//!
//! ## API Surface
//!
//! | Path                | Module                     | Access             |
//! |---------------------|----------------------------|--------------------|
//! | `/v1/healthcheck`   | [`routes::healthcheck`]    | anyone             |
//! | `/v1/users/me`      | [`routes::users`]          | authenticated      |
//! | `/debug/metrics`    | [`routes::debug`]          | anyone             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → Metrics → PanicGuard → [CORS] → RateLimiter → Authenticator
//!     → route GuardChain → Handler
//! ```
//!
//! Each stage either passes the request inward or writes one terminal
//! response. A rejected request never reaches a later stage.

pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

use std::future::Future;
use std::net::SocketAddr;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tokio::net::TcpListener;

use crate::middleware::metrics::metrics_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::{cors, recover, tracing_layer};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    pipeline(state, routes::router())
}

/// Wrap `api` in the gate.
///
/// Routes that need guards carry their own [`guards::GuardChain`]; the
/// stages mounted here apply to every route and to the 404 fallback.
pub fn pipeline(state: AppState, api: Router<AppState>) -> Router {
    let gated = api
        .fallback(routes::not_found)
        .layer(from_fn(routes::method_not_allowed))
        .layer(from_fn_with_state(state.stores.clone(), auth::authenticate))
        .layer(from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    let gated = if state.cors_origins.is_empty() {
        gated
    } else {
        gated.layer(cors::layer(state.cors_origins.clone()))
    };

    gated
        .layer(recover::layer())
        .layer(from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(tracing_layer::layer())
        .with_state(state)
}

/// Serve the gate on `listener` until `shutdown` resolves.
///
/// The idle-bucket sweeper runs for as long as the server does and is
/// stopped once in-flight requests have drained.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = state
        .limiter
        .enabled()
        .then(|| state.limiter.spawn_sweeper());

    let served = axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await;

    drop(sweeper);
    served
}
