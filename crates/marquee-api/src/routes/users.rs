//! `GET /v1/users/me`: the account the caller's bearer token resolved to.

use axum::routing::get;
use axum::{Json, Router};
use marquee_core::Identity;
use serde::Serialize;

use crate::auth::RequestIdentity;
use crate::error::AppError;
use crate::guards::GuardChain;
use crate::state::AppState;

/// Response envelope.
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: Identity,
}

/// Build the users router. Every route requires an authenticated caller.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/users/me",
        GuardChain::new().authenticated().protect(get(current_user)),
    )
}

async fn current_user(identity: RequestIdentity) -> Result<Json<UserEnvelope>, AppError> {
    match identity {
        RequestIdentity::User(user) => Ok(Json(UserEnvelope { user })),
        // The guard chain rejects anonymous callers before this runs.
        RequestIdentity::Anonymous => Err(marquee_core::AuthError::Unauthenticated.into()),
    }
}
