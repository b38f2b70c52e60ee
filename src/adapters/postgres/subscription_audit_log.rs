//! PostgreSQL implementation of SubscriptionAuditLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AuthUid, DomainError};
use crate::ports::{SubscriptionAuditEntry, SubscriptionAuditLog};

pub struct PostgresSubscriptionAuditLog {
    pool: PgPool,
}

impl PostgresSubscriptionAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    user_id: Uuid,
    change_type: String,
    previous: serde_json::Value,
    current: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for SubscriptionAuditEntry {
    fn from(row: AuditRow) -> Self {
        SubscriptionAuditEntry {
            user_id: AuthUid::from_uuid(row.user_id),
            change_type: row.change_type,
            previous: row.previous,
            current: row.current,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SubscriptionAuditLog for PostgresSubscriptionAuditLog {
    async fn append(&self, entry: SubscriptionAuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_audit (user_id, change_type, previous, current, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.user_id.as_uuid())
        .bind(&entry.change_type)
        .bind(&entry.previous)
        .bind(&entry.current)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append audit entry: {}", e)))?;

        Ok(())
    }

    async fn history_for_user(
        &self,
        user_id: &AuthUid,
        limit: i64,
    ) -> Result<Vec<SubscriptionAuditEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT user_id, change_type, previous, current, created_at
            FROM subscription_audit
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load audit history: {}", e)))?;

        Ok(rows.into_iter().map(SubscriptionAuditEntry::from).collect())
    }
}
