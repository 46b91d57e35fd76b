//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every rejection the gate produces, and every failure a handler behind it
//! reports, goes through [`AppError`] so that all error responses share one
//! shape: `{"error": "<message>"}`.
//!
//! Messages for 401/403 are fixed strings taken from
//! [`marquee_core::AuthError`]; they never name the permission, the account,
//! or the reason a credential was refused. Internal error details are logged
//! and never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::header::{HeaderValue, WWW_AUTHENTICATE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use marquee_core::AuthError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Fixed message for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Rejected by the gate (401, 403 or 429 depending on the variant).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No route matches the path (404).
    #[error("the requested resource could not be found")]
    NotFound,

    /// Route exists but not for this method (405).
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(auth) if auth.is_authentication_failure() => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Auth(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorBody { error: message })).into_response();

        // Credential problems tell the client which scheme to retry with.
        if matches!(
            &self,
            Self::Auth(AuthError::MalformedCredential | AuthError::InvalidCredential)
        ) {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Map JSON extraction failures to 400 so handlers can use `?` on
/// `Result<Json<T>, JsonRejection>`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
