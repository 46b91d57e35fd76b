//! # Identities
//!
//! The account record behind a credential, as far as the gate cares about
//! it: who it is, whether the account is activated, and what it may do.
//! Identities are owned by the identity store; the gate only reads them.

use serde::{Deserialize, Serialize};

use crate::permission::{PermissionCode, Permissions};

/// Opaque key of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw account key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw account key.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved account: activation state plus granted permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account key.
    pub id: UserId,
    /// Whether the account has completed activation.
    pub activated: bool,
    /// Granted permission codes.
    #[serde(default)]
    pub permissions: Permissions,
}

impl Identity {
    /// Whether this identity may exercise `code`.
    ///
    /// Activation is a precondition, not a permission: an unactivated
    /// account holds no effective permissions whatever its grant set says.
    pub fn can(&self, code: &PermissionCode) -> bool {
        self.activated && self.permissions.includes(code)
    }
}
