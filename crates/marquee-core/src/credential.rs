//! # Bearer Credentials
//!
//! A credential is a 26-character plaintext handed to the client once and
//! presented on every request as `Authorization: Bearer <plaintext>`. The
//! server side only ever keeps its SHA-256 hash, together with the owning
//! account, an expiry instant and a scope.
//!
//! ## Plaintext Format
//!
//! 19 bytes from the OS RNG, encoded as URL-safe base64 without padding,
//! which yields exactly [`TOKEN_PLAINTEXT_LEN`] characters drawn from
//! `[A-Za-z0-9_-]`. [`validate_plaintext`] checks length and alphabet before
//! any store lookup so garbage never reaches the database.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::ValidationError;
use crate::identity::UserId;

/// Required length of a credential plaintext.
pub const TOKEN_PLAINTEXT_LEN: usize = 26;

/// Random bytes behind a plaintext; 19 bytes encode to 26 base64 chars.
const TOKEN_ENTROPY_BYTES: usize = 19;

/// What a credential may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Sent to the user to activate their account. Never authenticates a request.
    Activation,
    /// Authenticates API requests.
    Authentication,
}

/// Check that a presented plaintext has the shape of a credential.
///
/// Only structure is checked; existence and expiry are the token store's job.
pub fn validate_plaintext(plaintext: &str) -> Result<(), ValidationError> {
    if plaintext.len() != TOKEN_PLAINTEXT_LEN {
        return Err(ValidationError::CredentialLength {
            actual: plaintext.len(),
            expected: TOKEN_PLAINTEXT_LEN,
        });
    }
    if !plaintext
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(ValidationError::CredentialCharset);
    }
    Ok(())
}

/// SHA-256 of a credential plaintext: the only form a store keeps.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialHash([u8; 32]);

impl CredentialHash {
    /// Hash a plaintext.
    pub fn of(plaintext: &str) -> Self {
        Self(Sha256::digest(plaintext.as_bytes()).into())
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

// Full hashes stay out of logs; eight hex chars are enough to correlate.
impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialHash({}…)", &self.to_hex()[..8])
    }
}

/// A freshly issued credential.
///
/// The plaintext is zeroized when the value is dropped and redacted from
/// `Debug` output.
#[derive(Clone)]
pub struct Credential {
    plaintext: Zeroizing<String>,
    /// Hash of the plaintext.
    pub hash: CredentialHash,
    /// Owning account.
    pub user_id: UserId,
    /// Instant after which the credential is no longer accepted.
    pub expires_at: DateTime<Utc>,
    /// What the credential may be used for.
    pub scope: TokenScope,
}

impl Credential {
    /// Issue a new random credential for `user_id`, valid for `ttl`.
    pub fn generate(user_id: UserId, ttl: Duration, scope: TokenScope) -> Self {
        let mut entropy = Zeroizing::new([0u8; TOKEN_ENTROPY_BYTES]);
        OsRng.fill_bytes(&mut entropy[..]);
        let plaintext = Zeroizing::new(URL_SAFE_NO_PAD.encode(&entropy[..]));
        Self::from_plaintext(plaintext.as_str(), user_id, Utc::now() + ttl, scope)
    }

    /// Rebuild a credential around a known plaintext (fixtures, tests).
    pub fn from_plaintext(
        plaintext: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        scope: TokenScope,
    ) -> Self {
        Self {
            hash: CredentialHash::of(plaintext),
            plaintext: Zeroizing::new(plaintext.to_string()),
            user_id,
            expires_at,
            scope,
        }
    }

    /// The plaintext to hand to the client.
    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("plaintext", &"[REDACTED]")
            .field("hash", &self.hash)
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}
