//! # Application State
//!
//! Shared state for the Axum application. Handlers take it through the
//! `State` extractor; each middleware stage is handed only the component it
//! needs (limiter, stores, metrics) when the pipeline is assembled.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::store::Stores;

/// Deployment facts reported by the healthcheck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Deployment environment name.
    pub environment: String,
    /// Server version.
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub limiter: RateLimiter,
    pub metrics: ApiMetrics,
    /// Trusted CORS origins; empty means no CORS layer.
    pub cors_origins: Vec<HeaderValue>,
}

impl AppState {
    /// Assemble state with no CORS origins.
    pub fn new(config: AppConfig, stores: Stores, limiter: RateLimiter) -> Self {
        Self {
            config: Arc::new(config),
            stores,
            limiter,
            metrics: ApiMetrics::new(),
            cors_origins: Vec::new(),
        }
    }

    /// Set the trusted CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<HeaderValue>) -> Self {
        self.cors_origins = origins;
        self
    }
}
