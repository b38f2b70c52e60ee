//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, authentication errors and error types that form the vocabulary
//! of the subscription domain.

mod auth;
mod errors;
mod ids;

pub use auth::AuthError;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuthUid, StripeCustomerId};
