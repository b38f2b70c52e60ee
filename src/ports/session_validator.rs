//! Session validation port for access tokens.
//!
//! The auth backend issues the tokens; this service only checks them and
//! reads the caller's uid from the `sub` claim.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthUid};

/// Validates access tokens and extracts the caller's identity.
///
/// # Contract
///
/// Implementations must:
/// - Validate the token signature
/// - Validate audience and expiry claims
/// - Return `AuthError::InvalidToken` for malformed/bad signature tokens
/// - Return `AuthError::TokenExpired` for expired tokens
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthUid, AuthError>;
}
