//! # Route Guards
//!
//! Per-route authorization checks that run after the authenticator has
//! attached a [`RequestIdentity`].
//!
//! | Guard                   | Rejects                         | Status |
//! |-------------------------|---------------------------------|--------|
//! | [`RequireAuthenticated`]| anonymous                       | 401    |
//! | [`RequireActivated`]    | anonymous / not activated       | 401 / 403 |
//! | [`RequirePermission`]   | anonymous / not activated / lacks code | 401 / 403 / 403 |
//!
//! Each guard implies the ones above it. A [`GuardChain`] runs guards in
//! the order they were added and stops at the first rejection; the handler
//! only runs if every guard passes.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use marquee_core::{AuthError, Identity, PermissionCode};

use crate::auth::RequestIdentity;
use crate::error::AppError;

/// One authorization check against the resolved identity.
pub trait Guard: Send + Sync + fmt::Debug {
    /// `Ok(())` to let the request through.
    fn check(&self, identity: &RequestIdentity) -> Result<(), AuthError>;
}

fn require_user(identity: &RequestIdentity) -> Result<&Identity, AuthError> {
    identity.user().ok_or(AuthError::Unauthenticated)
}

fn require_activated(identity: &RequestIdentity) -> Result<&Identity, AuthError> {
    let user = require_user(identity)?;
    if user.activated {
        Ok(user)
    } else {
        Err(AuthError::NotActivated)
    }
}

/// Rejects anonymous requests with 401.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuthenticated;

impl Guard for RequireAuthenticated {
    fn check(&self, identity: &RequestIdentity) -> Result<(), AuthError> {
        require_user(identity).map(|_| ())
    }
}

/// Rejects anonymous requests with 401 and unactivated accounts with 403.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireActivated;

impl Guard for RequireActivated {
    fn check(&self, identity: &RequestIdentity) -> Result<(), AuthError> {
        require_activated(identity).map(|_| ())
    }
}

/// Rejects requests whose account lacks one permission code.
///
/// Activation is checked first, so an unactivated account that happens to
/// hold the code still gets 403 "must be activated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirePermission(pub PermissionCode);

impl Guard for RequirePermission {
    fn check(&self, identity: &RequestIdentity) -> Result<(), AuthError> {
        let user = require_activated(identity)?;
        if user.can(&self.0) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(self.0.clone()))
        }
    }
}

/// Ordered list of guards for one route (or group of routes).
#[derive(Debug, Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    /// An empty chain; admits everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append any guard.
    pub fn with(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Append [`RequireAuthenticated`].
    pub fn authenticated(self) -> Self {
        self.with(RequireAuthenticated)
    }

    /// Append [`RequireActivated`].
    pub fn activated(self) -> Self {
        self.with(RequireActivated)
    }

    /// Append [`RequirePermission`] for `code`.
    pub fn permission(self, code: PermissionCode) -> Self {
        self.with(RequirePermission(code))
    }

    /// Run every guard in order; first rejection wins.
    pub fn check(&self, identity: &RequestIdentity) -> Result<(), AuthError> {
        self.guards.iter().try_for_each(|guard| guard.check(identity))
    }

    /// Mount this chain in front of the handlers of `method_router`.
    ///
    /// The layer wraps only the registered methods, not the method router's
    /// fallback: a method the route does not serve gets 405 and an unmatched
    /// path gets 404 whoever is asking.
    pub fn protect<S>(self, method_router: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        method_router.route_layer(from_fn_with_state(self, enforce))
    }
}

/// Middleware running a [`GuardChain`] against the request's identity.
pub async fn enforce(State(chain): State<GuardChain>, request: Request, next: Next) -> Response {
    let Some(identity) = request.extensions().get::<RequestIdentity>() else {
        return AppError::Internal("guarded route mounted outside the authenticator".into())
            .into_response();
    };

    if let Err(err) = chain.check(identity) {
        let user_id = identity.user().map(|u| u.id.get());
        tracing::info!(?user_id, reason = ?err, "request rejected by route guard");
        return AppError::from(err).into_response();
    }

    next.run(request).await
}
