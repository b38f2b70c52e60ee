//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors)
//! - `billing` - Stripe webhook verification, subscription state mapping and
//!   the idempotent webhook processor

pub mod billing;
pub mod foundation;
