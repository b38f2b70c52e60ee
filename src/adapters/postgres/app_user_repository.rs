//! PostgreSQL implementation of AppUserRepository.
//!
//! Only subscription columns of `app_users` are read or written here.
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{AppUser, SubscriptionStatus, SubscriptionUpdate};
use crate::domain::foundation::{AuthUid, DomainError, ErrorCode, StripeCustomerId};
use crate::ports::AppUserRepository;

pub struct PostgresAppUserRepository {
    pool: PgPool,
}

impl PostgresAppUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppUserRow {
    auth_uid: Uuid,
    stripe_customer_id: Option<String>,
    subscription_status: String,
    trial_expires_at: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    plan_id: Option<String>,
    stripe_subscription_id: Option<String>,
}

impl TryFrom<AppUserRow> for AppUser {
    type Error = DomainError;

    fn try_from(row: AppUserRow) -> Result<Self, Self::Error> {
        let subscription_status: SubscriptionStatus =
            row.subscription_status.parse().map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user row: {}", e))
            })?;
        let stripe_customer_id = row
            .stripe_customer_id
            .filter(|id| !id.is_empty())
            .map(StripeCustomerId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user row: {}", e))
            })?;

        Ok(AppUser {
            auth_uid: AuthUid::from_uuid(row.auth_uid),
            stripe_customer_id,
            subscription_status,
            trial_expires_at: row.trial_expires_at,
            current_period_end: row.current_period_end,
            plan_id: row.plan_id,
            stripe_subscription_id: row.stripe_subscription_id,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT auth_uid, stripe_customer_id, subscription_status, trial_expires_at,
           current_period_end, plan_id, stripe_subscription_id
    FROM app_users
"#;

#[async_trait]
impl AppUserRepository for PostgresAppUserRepository {
    async fn find_by_stripe_customer(
        &self,
        customer_id: &StripeCustomerId,
    ) -> Result<Option<AppUser>, DomainError> {
        let query = format!(
            "{} WHERE stripe_customer_id = $1 AND deleted_at IS NULL",
            SELECT_USER
        );
        let row: Option<AppUserRow> = sqlx::query_as(&query)
            .bind(customer_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find user by customer: {}", e)))?;

        row.map(AppUser::try_from).transpose()
    }

    async fn find_by_auth_uid(&self, auth_uid: &AuthUid) -> Result<Option<AppUser>, DomainError> {
        let query = format!("{} WHERE auth_uid = $1 AND deleted_at IS NULL", SELECT_USER);
        let row: Option<AppUserRow> = sqlx::query_as(&query)
            .bind(auth_uid.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find user: {}", e)))?;

        row.map(AppUser::try_from).transpose()
    }

    async fn apply_subscription_update(
        &self,
        auth_uid: &AuthUid,
        update: &SubscriptionUpdate,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE app_users SET
                subscription_status = COALESCE($2, subscription_status),
                current_period_end = COALESCE($3, current_period_end),
                plan_id = COALESCE($4, plan_id),
                stripe_subscription_id = COALESCE($5, stripe_subscription_id),
                trial_expires_at = CASE WHEN $6 THEN NULL ELSE trial_expires_at END,
                updated_at = NOW()
            WHERE auth_uid = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(auth_uid.as_uuid())
        .bind(update.subscription_status.map(|s| s.as_str()))
        .bind(update.current_period_end)
        .bind(update.plan_id.as_deref())
        .bind(update.stripe_subscription_id.as_deref())
        .bind(update.clear_trial)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to update subscription fields: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("auth_uid", auth_uid.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> AppUserRow {
        AppUserRow {
            auth_uid: Uuid::new_v4(),
            stripe_customer_id: Some("cus_1".to_string()),
            subscription_status: "past_due".to_string(),
            trial_expires_at: None,
            current_period_end: Some(Utc::now()),
            plan_id: Some("price_pro".to_string()),
            stripe_subscription_id: Some("sub_1".to_string()),
        }
    }

    #[test]
    fn row_converts_to_user() {
        let user = AppUser::try_from(row()).unwrap();

        assert_eq!(user.subscription_status, SubscriptionStatus::PastDue);
        assert_eq!(user.stripe_customer_id.unwrap().as_str(), "cus_1");
        assert_eq!(user.plan_id.as_deref(), Some("price_pro"));
    }

    #[test]
    fn empty_customer_id_reads_as_unlinked() {
        let user = AppUser::try_from(AppUserRow {
            stripe_customer_id: Some(String::new()),
            ..row()
        })
        .unwrap();

        assert!(user.stripe_customer_id.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = AppUser::try_from(AppUserRow {
            subscription_status: "expired".to_string(),
            ..row()
        })
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
