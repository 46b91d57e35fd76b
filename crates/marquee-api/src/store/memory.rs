//! In-memory implementation of both store traits, plus YAML fixture loading.
//!
//! Fixture format:
//!
//! ```yaml
//! users:
//!   - id: 1
//!     activated: true
//!     permissions: ["movies:read", "movies:write"]
//! tokens:
//!   - plaintext: BusinessManBusinessPlan123
//!     user_id: 1
//!     scope: authentication
//!     expires_at: 2030-01-01T00:00:00Z
//! ```
//!
//! Plaintexts are hashed on load; only hashes are kept in memory.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{
    validate_plaintext, Credential, CredentialHash, Identity, TokenScope, UserId, ValidationError,
};
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;

use super::{IdentityStore, StoreError, TokenStore};

/// Errors loading a fixture file.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("reading fixtures from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing fixtures: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("token #{index}: {source}")]
    InvalidToken {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("token #{index} belongs to unknown user {user_id}")]
    UnknownOwner { index: usize, user_id: UserId },
}

#[derive(Debug, Clone)]
struct StoredToken {
    user_id: UserId,
    expires_at: DateTime<Utc>,
    scope: TokenScope,
}

/// Thread-safe in-memory token and identity store.
///
/// Locks are `parking_lot` and never held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tokens: RwLock<HashMap<CredentialHash, StoredToken>>,
    identities: RwLock<HashMap<UserId, Identity>>,
}

#[derive(Debug, Deserialize)]
struct Fixtures {
    #[serde(default)]
    users: Vec<Identity>,
    #[serde(default)]
    tokens: Vec<FixtureToken>,
}

#[derive(Debug, Deserialize)]
struct FixtureToken {
    plaintext: String,
    user_id: UserId,
    scope: TokenScope,
    expires_at: DateTime<Utc>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load users and tokens from a YAML fixture file.
    pub fn from_fixture_file(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_fixture_str(&raw)
    }

    /// Load users and tokens from a YAML document.
    pub fn from_fixture_str(yaml: &str) -> Result<Self, FixtureError> {
        let fixtures: Fixtures = serde_yaml::from_str(yaml)?;
        let store = Self::new();

        for user in fixtures.users {
            store.insert_identity(user);
        }

        for (index, token) in fixtures.tokens.into_iter().enumerate() {
            validate_plaintext(&token.plaintext)
                .map_err(|source| FixtureError::InvalidToken { index, source })?;
            if !store.identities.read().contains_key(&token.user_id) {
                return Err(FixtureError::UnknownOwner {
                    index,
                    user_id: token.user_id,
                });
            }
            store.insert_credential(&Credential::from_plaintext(
                &token.plaintext,
                token.user_id,
                token.expires_at,
                token.scope,
            ));
        }

        tracing::debug!(
            users = store.identities.read().len(),
            tokens = store.tokens.read().len(),
            "loaded fixtures"
        );
        Ok(store)
    }

    /// Insert or replace an account.
    pub fn insert_identity(&self, identity: Identity) -> Option<Identity> {
        self.identities.write().insert(identity.id, identity)
    }

    /// Remove an account. Its credentials stay but no longer resolve.
    pub fn remove_identity(&self, id: UserId) -> Option<Identity> {
        self.identities.write().remove(&id)
    }

    /// Record a credential by its hash.
    pub fn insert_credential(&self, credential: &Credential) {
        self.tokens.write().insert(
            credential.hash,
            StoredToken {
                user_id: credential.user_id,
                expires_at: credential.expires_at,
                scope: credential.scope,
            },
        );
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn find_identity_by_credential(
        &self,
        hash: &CredentialHash,
        scope: TokenScope,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .tokens
            .read()
            .get(hash)
            .filter(|t| t.scope == scope && t.expires_at > now)
            .map(|t| t.user_id))
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn find_identity_by_key(&self, id: UserId) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;

    const FIXTURES: &str = r#"
users:
  - id: 1
    activated: true
    permissions: ["movies:read"]
  - id: 2
    activated: false
tokens:
  - plaintext: BusinessManBusinessPlan123
    user_id: 1
    scope: authentication
    expires_at: 2999-01-01T00:00:00Z
  - plaintext: BusinessManBusinessPlanNOO
    user_id: 2
    scope: activation
    expires_at: 2999-01-01T00:00:00Z
"#;

    #[tokio::test]
    async fn fixtures_resolve_by_hash() {
        let store = InMemoryStore::from_fixture_str(FIXTURES).unwrap();
        let owner = store
            .find_identity_by_credential(
                &CredentialHash::of("BusinessManBusinessPlan123"),
                TokenScope::Authentication,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(owner, Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn scope_must_match() {
        let store = InMemoryStore::from_fixture_str(FIXTURES).unwrap();
        let owner = store
            .find_identity_by_credential(
                &CredentialHash::of("BusinessManBusinessPlanNOO"),
                TokenScope::Authentication,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(owner, None);
    }

    #[tokio::test]
    async fn expired_credential_not_found() {
        let store = InMemoryStore::new();
        store.insert_identity(Identity {
            id: UserId::new(5),
            activated: true,
            permissions: Default::default(),
        });
        let cred = Credential::generate(UserId::new(5), Duration::minutes(5), TokenScope::Authentication);
        store.insert_credential(&cred);

        let later = cred.expires_at + Duration::seconds(1);
        let owner = store
            .find_identity_by_credential(&cred.hash, TokenScope::Authentication, later)
            .await
            .unwrap();
        assert_eq!(owner, None);

        let owner = store
            .find_identity_by_credential(&cred.hash, TokenScope::Authentication, Utc::now())
            .await
            .unwrap();
        assert_eq!(owner, Some(UserId::new(5)));
    }

    #[test]
    fn fixture_rejects_malformed_plaintext() {
        let yaml = r#"
users:
  - id: 1
    activated: true
tokens:
  - plaintext: short
    user_id: 1
    scope: authentication
    expires_at: 2999-01-01T00:00:00Z
"#;
        assert!(matches!(
            InMemoryStore::from_fixture_str(yaml),
            Err(FixtureError::InvalidToken { index: 0, .. })
        ));
    }

    #[test]
    fn fixture_rejects_orphan_token() {
        let yaml = r#"
tokens:
  - plaintext: BusinessManBusinessPlan123
    user_id: 9
    scope: authentication
    expires_at: 2999-01-01T00:00:00Z
"#;
        assert!(matches!(
            InMemoryStore::from_fixture_str(yaml),
            Err(FixtureError::UnknownOwner { index: 0, .. })
        ));
    }

    #[test]
    fn fixture_rejects_bad_permission_code() {
        let yaml = r#"
users:
  - id: 1
    activated: true
    permissions: ["MOVIES"]
"#;
        assert!(matches!(
            InMemoryStore::from_fixture_str(yaml),
            Err(FixtureError::Parse(_))
        ));
    }

    #[test]
    fn fixture_file_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURES.as_bytes()).unwrap();
        let store = InMemoryStore::from_fixture_file(file.path()).unwrap();
        assert_eq!(store.identities.read().len(), 2);
        assert_eq!(store.tokens.read().len(), 2);
    }

    #[test]
    fn missing_fixture_file_is_io_error() {
        let err = InMemoryStore::from_fixture_file(Path::new("/nonexistent/fixtures.yaml"))
            .unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }
}
