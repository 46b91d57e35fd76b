//! `GET /v1/healthcheck`: service status plus deployment environment and
//! version. Anonymous callers are allowed; the route still sits behind the
//! rate limiter and authenticator like every other.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Healthcheck response body.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Healthcheck {
    pub status: String,
    pub system_info: SystemInfo,
}

/// Deployment facts in the healthcheck.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
}

/// Build the healthcheck router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/healthcheck", get(healthcheck))
}

async fn healthcheck(State(state): State<AppState>) -> Json<Healthcheck> {
    Json(Healthcheck {
        status: "available".to_string(),
        system_info: SystemInfo {
            environment: state.config.environment.clone(),
            version: state.config.version.clone(),
        },
    })
}
