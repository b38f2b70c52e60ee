//! WebhookEventLedger port - Persisted lifecycle of every received webhook.
//!
//! One row per Stripe event id. The unique constraint on `event_id` is the
//! only concurrency control in the ingestion pipeline: when two deliveries
//! of the same event race, exactly one insert succeeds and the other sees
//! `InsertResult::AlreadyExists`.
//!
//! Rows are created on first sight of an event and reach a terminal status
//! (processed or failed) within the same request. They are never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AuthUid, DomainError, ValidationError};

/// Lifecycle status of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Received,
    Processing,
    Processed,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Processed and failed rows never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown ledger status '{}'", other),
            )),
        }
    }
}

/// A ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventRecord {
    /// Stripe event ID (evt_xxx format). Idempotency key.
    pub event_id: String,

    /// Type of Stripe event (e.g., "customer.subscription.created").
    pub event_type: String,

    /// Full verified event body, kept for replay and debugging.
    pub payload: serde_json::Value,

    pub status: LedgerStatus,

    pub received_at: DateTime<Utc>,

    pub processed_at: Option<DateTime<Utc>>,

    /// Diagnostic message, set only when status is failed.
    pub error: Option<String>,

    /// Affected user, set once resolved.
    pub user_id: Option<AuthUid>,
}

impl WebhookEventRecord {
    /// Creates the row written when processing of an event starts.
    pub fn processing(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload,
            status: LedgerStatus::Processing,
            received_at: Utc::now(),
            processed_at: None,
            error: None,
            user_id: None,
        }
    }
}

/// Result of attempting to insert a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// First time seeing this event.
    Inserted,
    /// A row for this event id already exists (duplicate delivery).
    AlreadyExists,
}

/// Port for the webhook event ledger.
#[async_trait]
pub trait WebhookEventLedger: Send + Sync {
    /// Whether a row exists for this event id, in any status.
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Insert a new row.
    ///
    /// A unique-constraint conflict is reported as `InsertResult::AlreadyExists`,
    /// never as an error.
    async fn insert(&self, record: WebhookEventRecord) -> Result<InsertResult, DomainError>;

    /// Mark the row processed, recording the affected user if one was resolved.
    async fn mark_processed(
        &self,
        event_id: &str,
        user_id: Option<AuthUid>,
    ) -> Result<(), DomainError>;

    /// Mark the row failed with a diagnostic message.
    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError>;

    /// Find a row by its Stripe event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Failed rows, oldest first, for manual reprocessing.
    async fn list_failed(&self, limit: i64) -> Result<Vec<WebhookEventRecord>, DomainError>;
}
