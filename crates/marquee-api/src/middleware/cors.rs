//! # CORS
//!
//! Only origins from the configured trusted list receive
//! `Access-Control-Allow-Origin`. Preflight requests (`OPTIONS` with
//! `Access-Control-Request-Method`) are answered here with 200 and never
//! reach the authenticator.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Methods a trusted origin may use in a preflighted request.
pub const PREFLIGHT_METHODS: [Method; 4] =
    [Method::OPTIONS, Method::PUT, Method::PATCH, Method::DELETE];

/// Parse space-separated origins, skipping any that are not valid header values.
pub fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split_whitespace()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Build the CORS layer for `trusted_origins`.
pub fn layer(trusted_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(trusted_origins))
        .allow_methods(PREFLIGHT_METHODS.to_vec())
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
