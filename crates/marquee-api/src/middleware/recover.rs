//! # Panic Guard
//!
//! Outermost gate stage. A panic anywhere further in (rate limiter,
//! authenticator, guards, handler) is caught here, logged with its payload,
//! and answered with one generic 500. The connection is marked
//! `Connection: close` since the handler may have left it mid-response.
//!
//! Unwinding stops at this layer; the server keeps serving other requests.

use std::any::Any;

use axum::http::header::{HeaderValue, CONNECTION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::{ErrorBody, INTERNAL_ERROR_MESSAGE};

/// Build the panic guard layer.
pub fn layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

/// Turn a caught panic payload into the fixed 500 response.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
