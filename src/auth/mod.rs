//! Credential verification and per-match access decisions.

pub mod access;
pub mod identity;

pub use identity::{Actor, IdentityError, IdentityVerifier, JwtIdentityVerifier};
