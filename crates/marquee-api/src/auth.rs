//! # Authentication Middleware
//!
//! Resolves the `Authorization` header into a [`RequestIdentity`] and
//! attaches it to the request extensions for the guards and handlers
//! further in.
//!
//! ## Policy
//!
//! ```text
//! no header                          → Anonymous, continue
//! not "Bearer <token>"               → 401 invalid authentication credentials
//! token fails length/alphabet check  → 401 (same body)
//! token unknown, expired, wrong scope→ 401 (same body)
//! owner missing from identity store  → 401 (same body)
//! store failure or timeout           → 500
//! otherwise                          → User(identity), continue
//! ```
//!
//! This stage never rejects a request for lacking a credential; that is the
//! job of the route guards. Every response passing through it, rejected or
//! not, carries `Vary: Authorization` so shared caches keep anonymous and
//! authenticated representations apart.

use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, AUTHORIZATION, VARY};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use marquee_core::{validate_plaintext, AuthError, CredentialHash, Identity};

use crate::error::AppError;
use crate::store::Stores;

// ── RequestIdentity ─────────────────────────────────────────────────────────

/// Who is making the request, as resolved by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdentity {
    /// No credential was presented.
    Anonymous,
    /// A valid credential resolved to this account.
    User(Identity),
}

impl RequestIdentity {
    /// The resolved account, if any.
    pub fn user(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::User(identity) => Some(identity),
        }
    }
}

/// Axum `FromRequestParts` implementation for `RequestIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 500 if none is present: the route was mounted outside the
/// authenticator, which is a wiring bug rather than a client error.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for RequestIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Internal("no request identity in context".into()))
    }
}

// ── Header parsing ──────────────────────────────────────────────────────────

/// Pull the bearer plaintext out of the request headers.
///
/// `Ok(None)` means no `Authorization` header at all. A header that is not
/// exactly `Bearer <token>` (or is not valid ASCII) is
/// [`AuthError::MalformedCredential`].
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(Some(token)),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Resolve a bearer plaintext to an identity.
///
/// Structural validation happens before any store call so malformed input
/// never costs a lookup.
pub async fn resolve_identity(stores: &Stores, plaintext: &str) -> Result<Identity, AppError> {
    validate_plaintext(plaintext).map_err(|reason| {
        tracing::warn!(%reason, "authentication failed: malformed bearer token");
        AuthError::InvalidCredential
    })?;

    let hash = CredentialHash::of(plaintext);
    let Some(user_id) = stores.credential_owner(&hash, Utc::now()).await? else {
        tracing::warn!(credential = ?hash, "authentication failed: unknown or expired token");
        return Err(AuthError::InvalidCredential.into());
    };

    match stores.identity(user_id).await? {
        Some(identity) => Ok(identity),
        None => {
            tracing::warn!(%user_id, "authentication failed: token owner no longer exists");
            Err(AuthError::InvalidCredential.into())
        }
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Attach a [`RequestIdentity`] to the request, or reject it with 401.
pub async fn authenticate(
    State(stores): State<Stores>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = bearer_token(request.headers()).map(|token| token.map(str::to_owned));
    let outcome = match presented {
        Ok(None) => Ok(RequestIdentity::Anonymous),
        Ok(Some(token)) => resolve_identity(&stores, &token)
            .await
            .map(RequestIdentity::User),
        Err(err) => {
            tracing::warn!("authentication failed: authorization header is not a bearer token");
            Err(AppError::from(err))
        }
    };

    let mut response = match outcome {
        Ok(identity) => {
            if let RequestIdentity::User(user) = &identity {
                tracing::debug!(user_id = %user.id, "authenticated request");
            }
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };

    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use chrono::Duration as ChronoDuration;
    use http_body_util::BodyExt;
    use marquee_core::{Credential, PermissionCode, Permissions, TokenScope, UserId};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const VALID: &str = "BusinessManBusinessPlan123";

    fn stores() -> (Arc<InMemoryStore>, Stores) {
        let store = Arc::new(InMemoryStore::new());
        store.insert_identity(Identity {
            id: UserId::new(1),
            activated: true,
            permissions: ["movies:read".parse::<PermissionCode>().unwrap()]
                .into_iter()
                .collect::<Permissions>(),
        });
        store.insert_credential(&Credential::from_plaintext(
            VALID,
            UserId::new(1),
            Utc::now() + ChronoDuration::hours(1),
            TokenScope::Authentication,
        ));
        let stores = Stores::in_memory(store.clone(), Duration::from_secs(1));
        (store, stores)
    }

    /// Build a minimal router that echoes the resolved identity.
    fn test_app(stores: Stores) -> Router {
        Router::new()
            .route(
                "/test",
                get(|identity: RequestIdentity| async move {
                    match identity {
                        RequestIdentity::Anonymous => "anonymous".to_string(),
                        RequestIdentity::User(user) => format!("user:{}", user.id),
                    }
                }),
            )
            .layer(from_fn_with_state(stores, authenticate))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let vary = response
            .headers()
            .get(VARY)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, vary, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn no_header_is_anonymous() {
        let (_, stores) = stores();
        let (status, vary, body) = call(test_app(stores), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
        assert_eq!(vary.as_deref(), Some("Authorization"));
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let (_, stores) = stores();
        let (status, vary, body) = call(test_app(stores), Some(&format!("Bearer {VALID}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user:1");
        assert_eq!(vary.as_deref(), Some("Authorization"));
    }

    #[tokio::test]
    async fn missing_scheme_prefix_rejected() {
        let (_, stores) = stores();
        let (status, vary, body) = call(test_app(stores), Some(VALID)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(vary.as_deref(), Some("Authorization"));
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"], "invalid authentication credentials");
    }

    #[tokio::test]
    async fn malformed_and_unknown_bodies_match() {
        let (_, stores) = stores();
        let malformed = call(test_app(stores.clone()), Some("wasd")).await;
        let short = call(test_app(stores.clone()), Some("Bearer wasd")).await;
        let unknown = call(test_app(stores), Some("Bearer BusinessManBusinessPlan404")).await;
        assert_eq!(malformed.0, StatusCode::UNAUTHORIZED);
        assert_eq!(malformed, short);
        assert_eq!(malformed, unknown);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let (_, stores) = stores();
        let (status, _, _) = call(test_app(stores), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_rejected() {
        let (store, stores) = stores();
        store.insert_credential(&Credential::from_plaintext(
            "ExpiredExpiredExpired12345",
            UserId::new(1),
            Utc::now() - ChronoDuration::seconds(1),
            TokenScope::Authentication,
        ));
        let (status, _, _) =
            call(test_app(stores), Some("Bearer ExpiredExpiredExpired12345")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn activation_scope_token_does_not_authenticate() {
        let (store, stores) = stores();
        store.insert_credential(&Credential::from_plaintext(
            "ActivationActivationActiv1",
            UserId::new(1),
            Utc::now() + ChronoDuration::hours(1),
            TokenScope::Activation,
        ));
        let (status, _, _) =
            call(test_app(stores), Some("Bearer ActivationActivationActiv1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleted_owner_rejected() {
        let (store, stores) = stores();
        store.remove_identity(UserId::new(1));
        let (status, _, _) = call(test_app(stores), Some(&format!("Bearer {VALID}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Ok(None));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Ok(Some("abc")));

        for bad in ["Bearer", "Bearer ", "bearer abc", "Bearer a b", "Token abc", "abc"] {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(bad));
            assert_eq!(
                bearer_token(&headers),
                Err(AuthError::MalformedCredential),
                "accepted {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn extractor_without_middleware_is_internal_error() {
        let app: Router = Router::new().route(
            "/test",
            get(|_identity: RequestIdentity| async { "unreachable" }),
        );
        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
