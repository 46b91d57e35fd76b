#![deny(missing_docs)]

//! # marquee-core: Foundational Types for the Marquee API Gate
//!
//! Every request reaching the movie API passes a gate that rate limits the
//! client, resolves its bearer credential into an identity, and checks the
//! identity against the route's requirements. This crate holds the types
//! that gate reasons about. It has no HTTP or runtime dependencies.
//!
//! ## Design Principles
//!
//! 1. **Newtypes for identifiers.** A [`UserId`] is not an `i64`, a
//!    [`ClientKey`] is not a `SocketAddr`, a [`PermissionCode`] is not a
//!    `String`. Each validates at construction.
//!
//! 2. **Credentials are hashed at the boundary.** A presented plaintext is
//!    validated structurally and reduced to a [`CredentialHash`] before any
//!    store sees it. Plaintexts are zeroized on drop and never logged.
//!
//! 3. **One error taxonomy for the gate.** [`AuthError`] carries the fixed,
//!    client-facing message of every rejection the gate can produce.

pub mod client;
pub mod credential;
pub mod error;
pub mod identity;
pub mod permission;

pub use client::ClientKey;
pub use credential::{
    validate_plaintext, Credential, CredentialHash, TokenScope, TOKEN_PLAINTEXT_LEN,
};
pub use error::{AuthError, ValidationError};
pub use identity::{Identity, UserId};
pub use permission::{PermissionCode, Permissions};
