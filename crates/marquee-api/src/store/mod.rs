//! # Credential & Identity Stores
//!
//! The gate does not own account data. It asks two collaborators:
//!
//! - [`TokenStore`]: which account owns this (hashed) credential, if it is
//!   unexpired and of the requested scope?
//! - [`IdentityStore`]: what is the activation state and permission set of
//!   this account?
//!
//! Both are async traits so a database-backed implementation can sit
//! behind them. [`Stores`] bundles the two with a per-call deadline so a
//! slow backend turns into a 500 for the affected request instead of a
//! hung connection. [`InMemoryStore`] backs tests and fixture-driven runs.

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{CredentialHash, Identity, TokenScope, UserId};
use thiserror::Error;

pub use memory::{FixtureError, InMemoryStore};

/// Failure talking to a store. Distinct from "not found", which is `Ok(None)`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not answer (connection lost, pool exhausted, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the configured deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Lookup of credential owners.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Return the owner of the credential with `hash`, provided it has
    /// `scope` and expires strictly after `now`.
    async fn find_identity_by_credential(
        &self,
        hash: &CredentialHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StoreError>;
}

/// Lookup of account state.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Return the account with key `id`.
    async fn find_identity_by_key(&self, id: UserId) -> Result<Option<Identity>, StoreError>;
}

/// Both collaborators plus the deadline applied to every call.
#[derive(Clone)]
pub struct Stores {
    tokens: Arc<dyn TokenStore>,
    identities: Arc<dyn IdentityStore>,
    timeout: Duration,
}

impl Stores {
    /// Bundle the two stores behind a per-call `timeout`.
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        identities: Arc<dyn IdentityStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            identities,
            timeout,
        }
    }

    /// Use one [`InMemoryStore`] for both roles.
    pub fn in_memory(store: Arc<InMemoryStore>, timeout: Duration) -> Self {
        Self::new(store.clone(), store, timeout)
    }

    /// Owner of an unexpired `authentication`-scope credential.
    pub async fn credential_owner(
        &self,
        hash: &CredentialHash,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StoreError> {
        tokio::time::timeout(
            self.timeout,
            self.tokens
                .find_identity_by_credential(hash, TokenScope::Authentication, now),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    /// Account state for `id`.
    pub async fn identity(&self, id: UserId) -> Result<Option<Identity>, StoreError> {
        tokio::time::timeout(self.timeout, self.identities.find_identity_by_key(id))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
