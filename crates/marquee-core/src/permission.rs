//! # Permission Codes
//!
//! A permission code names a capability granted to an account, written
//! `<resource>:<action>` (e.g. `movies:read`, `movies:write`). Codes are
//! validated at construction so a typo in a route declaration or a fixture
//! fails loudly instead of silently denying every request.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated `<resource>:<action>` permission code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Validate and wrap a permission code.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        };
        match code.split_once(':') {
            Some((resource, action)) if valid_part(resource) && valid_part(action) => {
                Ok(Self(code))
            }
            _ => Err(ValidationError::InvalidPermissionCode(code)),
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermissionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0
    }
}

/// The set of permission codes granted to an account.
///
/// Ordered so that serialized output and log lines are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeSet<PermissionCode>);

impl Permissions {
    /// Whether the set contains `code`.
    pub fn includes(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    /// Number of granted codes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no codes are granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PermissionCode> for Permissions {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_resource_action() {
        let code = PermissionCode::new("movies:read").unwrap();
        assert_eq!(code.as_str(), "movies:read");
        assert!(PermissionCode::new("user_profiles:write-all").is_ok());
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "movies", ":read", "movies:", "Movies:read", "movies:read:all", "movies read"] {
            assert!(PermissionCode::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn permissions_includes() {
        let perms: Permissions = ["movies:read", "movies:write"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        assert!(perms.includes(&"movies:read".parse().unwrap()));
        assert!(!perms.includes(&"users:read".parse().unwrap()));
        assert_eq!(perms.len(), 2);
    }

    #[test]
    fn duplicate_codes_collapse() {
        let perms: Permissions = ["movies:read", "movies:read"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        assert_eq!(perms.len(), 1);
    }

    #[test]
    fn serde_rejects_invalid_code() {
        let result: Result<Permissions, _> = serde_json::from_str(r#"["movies:read", "bogus"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn serde_serializes_as_plain_strings() {
        let perms: Permissions = ["movies:write", "movies:read"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        let json = serde_json::to_string(&perms).unwrap();
        assert_eq!(json, r#"["movies:read","movies:write"]"#);
    }
}
