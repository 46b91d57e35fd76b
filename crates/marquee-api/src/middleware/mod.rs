//! # Cross-Cutting Middleware
//!
//! - `recover`: panic guard; turns a handler panic into one 500 response.
//! - `rate_limit`: per-client token bucket, 429 on exhaustion.
//! - `metrics`: in-process request/response counters.
//! - `tracing_layer`: request spans via `tower_http::trace`.
//! - `cors`: trusted-origin CORS, mounted only when origins are configured.

pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod recover;
pub mod tracing_layer;
