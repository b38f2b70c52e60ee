//! AppUserRepository port - Subscription fields of application users.
//!
//! User records belong to the auth/database backend. This port exposes only
//! the lookups and the partial subscription update the webhook pipeline and
//! status query need.

use async_trait::async_trait;

use crate::domain::billing::{AppUser, SubscriptionUpdate};
use crate::domain::foundation::{AuthUid, DomainError, StripeCustomerId};

#[async_trait]
pub trait AppUserRepository: Send + Sync {
    /// Find the live user linked to a billing customer.
    ///
    /// Soft-deleted users are never returned.
    async fn find_by_stripe_customer(
        &self,
        customer_id: &StripeCustomerId,
    ) -> Result<Option<AppUser>, DomainError>;

    /// Find a live user by auth identity.
    async fn find_by_auth_uid(&self, auth_uid: &AuthUid) -> Result<Option<AppUser>, DomainError>;

    /// Write the set fields of `update`, leaving the others untouched.
    ///
    /// Returns `UserNotFound` when no live user has this identity.
    async fn apply_subscription_update(
        &self,
        auth_uid: &AuthUid,
        update: &SubscriptionUpdate,
    ) -> Result<(), DomainError>;
}
