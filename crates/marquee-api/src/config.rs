//! # Server Configuration
//!
//! Command-line flags with environment fallbacks, parsed once at startup.
//! The rate-limit tunables are frozen into a [`RateLimitConfig`] here and
//! never change while the server runs.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};

use crate::middleware::cors::parse_origins;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimitConfigError};
use crate::state::AppConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Marquee API gate
///
/// Rate limiting, bearer-token authentication and per-route authorization
/// in front of a JSON API.
#[derive(Parser, Debug, Clone)]
#[command(name = "marquee-api", version, about, long_about = None)]
pub struct Config {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Deployment environment name, reported by the healthcheck.
    #[arg(long = "env", env = "MARQUEE_ENV", default_value = "development")]
    pub environment: String,

    /// Rate limiter refill rate, in requests per second.
    #[arg(long, env = "MARQUEE_LIMITER_RPS", default_value_t = 2.0)]
    pub limiter_rps: f64,

    /// Rate limiter bucket capacity.
    #[arg(long, env = "MARQUEE_LIMITER_BURST", default_value_t = 4)]
    pub limiter_burst: u32,

    /// Enable the rate limiter.
    #[arg(
        long,
        env = "MARQUEE_LIMITER_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub limiter_enabled: bool,

    /// Evict rate limiter buckets idle for this many seconds.
    #[arg(long, env = "MARQUEE_LIMITER_IDLE_TTL_SECS", default_value_t = 180)]
    pub limiter_idle_ttl_secs: u64,

    /// Run the bucket eviction sweep every this many seconds.
    #[arg(long, env = "MARQUEE_LIMITER_SWEEP_SECS", default_value_t = 60)]
    pub limiter_sweep_secs: u64,

    /// Deadline for each token/identity store call, in milliseconds.
    #[arg(long, env = "MARQUEE_STORE_TIMEOUT_MS", default_value_t = 3000)]
    pub store_timeout_ms: u64,

    /// Trusted CORS origins, space separated. Empty disables CORS.
    #[arg(long, env = "MARQUEE_CORS_TRUSTED_ORIGINS", default_value = "")]
    pub cors_trusted_origins: String,

    /// YAML file of users and tokens to seed the in-memory stores.
    #[arg(long, env = "MARQUEE_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "MARQUEE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Validated rate limiter settings.
    pub fn rate_limit(&self) -> Result<RateLimitConfig, RateLimitConfigError> {
        let config = RateLimitConfig {
            enabled: self.limiter_enabled,
            requests_per_second: self.limiter_rps,
            burst: self.limiter_burst,
            idle_ttl: Duration::from_secs(self.limiter_idle_ttl_secs),
            sweep_interval: Duration::from_secs(self.limiter_sweep_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Per-call store deadline.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Parsed trusted origins.
    pub fn trusted_origins(&self) -> Vec<HeaderValue> {
        parse_origins(&self.cors_trusted_origins)
    }

    /// The subset reported by the healthcheck.
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            environment: self.environment.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
