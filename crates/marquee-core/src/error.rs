//! # Error Hierarchy
//!
//! Two families, both built with `thiserror`:
//!
//! - [`ValidationError`]: a value failed the format rules of its newtype.
//!   These carry diagnostic context for operators (fixture files, config).
//! - [`AuthError`]: a request was rejected by the gate. The `Display` text
//!   is the exact message returned to the client, so it never varies with
//!   the root cause beyond the category.

use thiserror::Error;

use crate::permission::PermissionCode;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Permission code is not of the form `resource:action`.
    #[error("invalid permission code: \"{0}\" (expected <resource>:<action> in lowercase)")]
    InvalidPermissionCode(String),

    /// Credential plaintext has the wrong length.
    #[error("invalid credential length: {actual} (expected {expected})")]
    CredentialLength {
        /// Length of the presented plaintext, in bytes.
        actual: usize,
        /// The required length.
        expected: usize,
    },

    /// Credential plaintext contains a character outside the token alphabet.
    #[error("invalid credential: characters must be in [A-Za-z0-9_-]")]
    CredentialCharset,
}

/// A rejection produced by the request gate.
///
/// The `Display` output is the client-facing message. Malformed, unknown,
/// expired and structurally invalid credentials all collapse into the same
/// text so the response never reveals which case applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// `Authorization` header present but not `Bearer <token>`.
    #[error("invalid authentication credentials")]
    MalformedCredential,

    /// Credential failed validation, is unknown, is expired, or its owner
    /// no longer exists.
    #[error("invalid authentication credentials")]
    InvalidCredential,

    /// Anonymous caller on a route that requires an identity.
    #[error("you must be authenticated to access this resource")]
    Unauthenticated,

    /// Identity exists but the account has not been activated.
    #[error("your user account must be activated to access this resource")]
    NotActivated,

    /// Identity lacks the permission code a route requires.
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    MissingPermission(PermissionCode),

    /// Client exhausted its request budget.
    #[error("rate limit exceeded")]
    RateLimited,
}

impl AuthError {
    /// Whether this rejection means "who are you?" (401) rather than
    /// "you may not" (403) or "slow down" (429).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedCredential | Self::InvalidCredential | Self::Unauthenticated
        )
    }
}
