//! PostgreSQL implementation of WebhookEventLedger.
//!
//! Idempotency rests on the `stripe_webhook_events_event_id_key` unique
//! constraint: a plain INSERT either wins or fails with SQLSTATE 23505.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AuthUid, DomainError, ErrorCode};
use crate::ports::{InsertResult, LedgerStatus, WebhookEventLedger, WebhookEventRecord};

/// PostgreSQL `unique_violation` SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresWebhookEventLedger {
    pool: PgPool,
}

impl PostgresWebhookEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    event_id: String,
    event_type: String,
    payload: serde_json::Value,
    status: String,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    user_id: Option<Uuid>,
}

impl TryFrom<LedgerRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let status: LedgerStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid ledger row: {}", e))
        })?;

        Ok(WebhookEventRecord {
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            status,
            received_at: row.received_at,
            processed_at: row.processed_at,
            error: row.error,
            user_id: row.user_id.map(AuthUid::from_uuid),
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

fn not_found(event_id: &str) -> DomainError {
    DomainError::new(
        ErrorCode::WebhookEventNotFound,
        format!("No ledger row for event {}", event_id),
    )
}

#[async_trait]
impl WebhookEventLedger for PostgresWebhookEventLedger {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stripe_webhook_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check webhook event: {}", e)))?;

        Ok(exists)
    }

    async fn insert(&self, record: WebhookEventRecord) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stripe_webhook_events (
                event_id, event_type, payload, status, received_at, processed_at, error, user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.status.as_str())
        .bind(record.received_at)
        .bind(record.processed_at)
        .bind(&record.error)
        .bind(record.user_id.map(|u| *u.as_uuid()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertResult::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertResult::AlreadyExists),
            Err(e) => Err(DomainError::database(format!(
                "Failed to insert webhook event: {}",
                e
            ))),
        }
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        user_id: Option<AuthUid>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE stripe_webhook_events SET
                status = 'processed',
                processed_at = NOW(),
                error = NULL,
                user_id = COALESCE($2, user_id)
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(user_id.map(|u| *u.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark webhook processed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(event_id));
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE stripe_webhook_events SET
                status = 'failed',
                processed_at = NOW(),
                error = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark webhook failed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(event_id));
        }
        Ok(())
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<LedgerRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, payload, status, received_at, processed_at, error, user_id
            FROM stripe_webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find webhook event: {}", e)))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn list_failed(&self, limit: i64) -> Result<Vec<WebhookEventRecord>, DomainError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, payload, status, received_at, processed_at, error, user_id
            FROM stripe_webhook_events
            WHERE status = 'failed'
            ORDER BY received_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list failed webhooks: {}", e)))?;

        rows.into_iter().map(WebhookEventRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(status: &str) -> LedgerRow {
        LedgerRow {
            event_id: "evt_1".to_string(),
            event_type: "invoice.payment_failed".to_string(),
            payload: json!({"id": "evt_1"}),
            status: status.to_string(),
            received_at: Utc::now(),
            processed_at: None,
            error: None,
            user_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn row_converts_to_record() {
        let source = row("failed");
        let user = source.user_id;

        let record = WebhookEventRecord::try_from(source).unwrap();

        assert_eq!(record.status, LedgerStatus::Failed);
        assert_eq!(record.user_id.map(|u| *u.as_uuid()), user);
        assert_eq!(record.payload["id"], "evt_1");
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let err = WebhookEventRecord::try_from(row("archived")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
