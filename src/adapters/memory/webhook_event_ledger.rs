//! In-memory webhook event ledger for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthUid, DomainError, ErrorCode};
use crate::ports::{InsertResult, LedgerStatus, WebhookEventLedger, WebhookEventRecord};

/// Ledger backed by a HashMap keyed on event id.
///
/// `insert` checks and writes under one write lock, so concurrent inserts
/// of the same id behave like a unique constraint.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookEventLedger {
    records: Arc<RwLock<HashMap<String, WebhookEventRecord>>>,
}

impl InMemoryWebhookEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, across all statuses.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn finish(
        &self,
        event_id: &str,
        status: LedgerStatus,
        error: Option<String>,
        user_id: Option<AuthUid>,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(event_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::WebhookEventNotFound,
                format!("No ledger row for event {}", event_id),
            )
        })?;

        record.status = status;
        record.processed_at = Some(Utc::now());
        record.error = error;
        if user_id.is_some() {
            record.user_id = user_id;
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookEventLedger for InMemoryWebhookEventLedger {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        Ok(self.records.read().await.contains_key(event_id))
    }

    async fn insert(&self, record: WebhookEventRecord) -> Result<InsertResult, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.event_id) {
            return Ok(InsertResult::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record);
        Ok(InsertResult::Inserted)
    }

    async fn mark_processed(
        &self,
        event_id: &str,
        user_id: Option<AuthUid>,
    ) -> Result<(), DomainError> {
        self.finish(event_id, LedgerStatus::Processed, None, user_id)
            .await
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        self.finish(event_id, LedgerStatus::Failed, Some(error.to_string()), None)
            .await
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn list_failed(&self, limit: i64) -> Result<Vec<WebhookEventRecord>, DomainError> {
        let records = self.records.read().await;
        let mut failed: Vec<_> = records
            .values()
            .filter(|r| r.status == LedgerStatus::Failed)
            .cloned()
            .collect();
        failed.sort_by_key(|r| r.received_at);
        failed.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(failed)
    }
}
