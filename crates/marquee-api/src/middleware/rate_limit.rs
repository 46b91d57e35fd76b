//! # Per-Client Rate Limiting
//!
//! Token-bucket rate limiter keyed by the peer IP address.
//!
//! Each client gets a bucket holding up to `burst` tokens, created full on
//! the client's first request. Every call refills the bucket by
//! `elapsed * requests_per_second` (capped at `burst`) and then spends one
//! token, or rejects with 429 if less than one is available. A rejection
//! spends nothing.
//!
//! The whole table sits behind one `parking_lot::Mutex`; each admission
//! decision is a single critical section. Buckets untouched for longer than
//! `idle_ttl` are dropped by a background sweep so the table does not grow
//! with every address ever seen.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use marquee_core::{AuthError, ClientKey};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::error::AppError;

/// Rate limiter configuration. Fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Whether the limiter runs at all.
    pub enabled: bool,
    /// Refill rate, in tokens per second.
    pub requests_per_second: f64,
    /// Bucket capacity; also the number of back-to-back requests a new client may make.
    pub burst: u32,
    /// Buckets idle for longer than this are evicted.
    pub idle_ttl: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst: 4,
            idle_ttl: Duration::from_secs(180),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Rejected rate limiter configuration.
#[derive(Error, Debug, PartialEq)]
pub enum RateLimitConfigError {
    #[error("requests per second must be a positive finite number, got {0}")]
    InvalidRate(f64),
    #[error("burst must be at least 1")]
    ZeroBurst,
    #[error("sweep interval must be non-zero")]
    ZeroSweepInterval,
}

impl RateLimitConfig {
    /// Check the invariants the limiter relies on.
    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(RateLimitConfigError::InvalidRate(self.requests_per_second));
        }
        if self.burst == 0 {
            return Err(RateLimitConfigError::ZeroBurst);
        }
        if self.sweep_interval.is_zero() {
            return Err(RateLimitConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}

/// Per-client bucket state.
#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared rate limiter state. Cloning shares the bucket table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<ClientKey, Bucket>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether requests are being limited.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Admit or reject one request from `key`.
    pub fn allow(&self, key: ClientKey) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut buckets = self.buckets.lock();
        // Read the clock under the lock so refills are applied in order.
        self.admit(&mut buckets, key, Instant::now())
    }

    /// [`allow`](Self::allow) against an explicit clock reading.
    pub fn allow_at(&self, key: ClientKey, now: Instant) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut buckets = self.buckets.lock();
        self.admit(&mut buckets, key, now)
    }

    fn admit(&self, buckets: &mut HashMap<ClientKey, Bucket>, key: ClientKey, now: Instant) -> bool {
        let capacity = f64::from(self.config.burst);
        let bucket = buckets.entry(key).or_insert(Bucket {
            tokens: capacity,
            last_refill: now,
        });

        if now > bucket.last_refill {
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * self.config.requests_per_second).min(capacity);
            bucket.last_refill = now;
        }

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently held by `key`'s bucket, without refilling.
    #[cfg(test)]
    fn tokens(&self, key: ClientKey) -> Option<f64> {
        self.buckets.lock().get(&key).map(|b| b.tokens)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Whether no clients are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop buckets last touched `idle_ttl` or more before `now`.
    /// Returns the number evicted.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let ttl = self.config.idle_ttl;
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < ttl);
        before - buckets.len()
    }

    /// Start the background eviction sweep on the current tokio runtime.
    ///
    /// The sweep stops when the returned handle is dropped.
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        let limiter = self.clone();
        let period = self.config.sweep_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep_idle(Instant::now());
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = limiter.len(), "evicted idle rate-limit buckets");
                }
            }
        });
        SweeperHandle(task)
    }
}

/// Owns the background sweep task; aborts it on drop.
#[derive(Debug)]
pub struct SweeperHandle(JoinHandle<()>);

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Middleware that enforces per-client rate limits.
///
/// The client key is the IP of the peer address from `ConnectInfo`. The
/// server must be started with `into_make_service_with_connect_info`;
/// without it every request fails with 500.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.enabled() {
        return next.run(request).await;
    }

    let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>().cloned()
    else {
        return AppError::Internal("peer address unavailable; serve with connect info".into())
            .into_response();
    };

    let key = ClientKey::from(addr);
    if !limiter.allow(key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return AppError::from(AuthError::RateLimited).into_response();
    }

    next.run(request).await
}
