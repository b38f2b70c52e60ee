//! In-memory user store for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{AppUser, SubscriptionUpdate};
use crate::domain::foundation::{AuthUid, DomainError, ErrorCode, StripeCustomerId};
use crate::ports::AppUserRepository;

/// User store backed by a HashMap keyed on auth uid.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppUserRepository {
    users: Arc<RwLock<HashMap<AuthUid, AppUser>>>,
    deleted: Arc<RwLock<Vec<AuthUid>>>,
    updates_applied: Arc<AtomicUsize>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemoryAppUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user.
    pub async fn insert(&self, user: AppUser) {
        self.users.write().await.insert(user.auth_uid, user);
    }

    /// Soft-deletes a user; it stays stored but is no longer resolved.
    pub async fn soft_delete(&self, auth_uid: AuthUid) {
        self.deleted.write().await.push(auth_uid);
    }

    /// Current stored state, including soft-deleted users.
    pub async fn get(&self, auth_uid: &AuthUid) -> Option<AppUser> {
        self.users.read().await.get(auth_uid).cloned()
    }

    /// Number of successful `apply_subscription_update` calls.
    pub fn updates_applied(&self) -> usize {
        self.updates_applied.load(Ordering::SeqCst)
    }

    /// Makes every subsequent update fail with a database error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    async fn is_deleted(&self, auth_uid: &AuthUid) -> bool {
        self.deleted.read().await.contains(auth_uid)
    }
}

#[async_trait]
impl AppUserRepository for InMemoryAppUserRepository {
    async fn find_by_stripe_customer(
        &self,
        customer_id: &StripeCustomerId,
    ) -> Result<Option<AppUser>, DomainError> {
        let users = self.users.read().await;
        let deleted = self.deleted.read().await;
        Ok(users
            .values()
            .filter(|u| !deleted.contains(&u.auth_uid))
            .find(|u| u.stripe_customer_id.as_ref() == Some(customer_id))
            .cloned())
    }

    async fn find_by_auth_uid(&self, auth_uid: &AuthUid) -> Result<Option<AppUser>, DomainError> {
        if self.is_deleted(auth_uid).await {
            return Ok(None);
        }
        Ok(self.users.read().await.get(auth_uid).cloned())
    }

    async fn apply_subscription_update(
        &self,
        auth_uid: &AuthUid,
        update: &SubscriptionUpdate,
    ) -> Result<(), DomainError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DomainError::database("connection reset by peer"));
        }
        if self.is_deleted(auth_uid).await {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found"));
        }

        let mut users = self.users.write().await;
        let user = users
            .get_mut(auth_uid)
            .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "User not found"))?;
        user.apply(update);
        self.updates_applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;
    use uuid::Uuid;

    fn linked_user(customer: &str) -> AppUser {
        AppUser::new_trial(AuthUid::from_uuid(Uuid::new_v4()), None)
            .with_customer(StripeCustomerId::new(customer).unwrap())
    }

    #[tokio::test]
    async fn finds_user_by_customer() {
        let repo = InMemoryAppUserRepository::new();
        let user = linked_user("cus_1");
        repo.insert(user.clone()).await;

        let found = repo
            .find_by_stripe_customer(&StripeCustomerId::new("cus_1").unwrap())
            .await
            .unwrap();

        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    async fn soft_deleted_users_are_not_resolved() {
        let repo = InMemoryAppUserRepository::new();
        let user = linked_user("cus_1");
        repo.insert(user.clone()).await;
        repo.soft_delete(user.auth_uid).await;

        let found = repo
            .find_by_stripe_customer(&StripeCustomerId::new("cus_1").unwrap())
            .await
            .unwrap();

        assert!(found.is_none());
        assert!(repo.find_by_auth_uid(&user.auth_uid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let repo = InMemoryAppUserRepository::new();

        let err = repo
            .apply_subscription_update(
                &AuthUid::from_uuid(Uuid::new_v4()),
                &SubscriptionUpdate {
                    subscription_status: Some(SubscriptionStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert_eq!(repo.updates_applied(), 0);
    }
}
