//! SubscriptionAuditLog port - Append-only trail of subscription changes.
//!
//! Tracks user state changes, not event processing state. Writes are
//! best-effort: callers log failures and carry on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::foundation::{AuthUid, DomainError};

/// Default number of entries returned by `history_for_user`.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Before/after snapshot of one subscription change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionAuditEntry {
    pub user_id: AuthUid,

    /// Free-form tag such as "subscription_created".
    pub change_type: String,

    /// Changed fields before the update.
    pub previous: serde_json::Value,

    /// Changed fields after the update.
    pub current: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

impl SubscriptionAuditEntry {
    pub fn new(
        user_id: AuthUid,
        change_type: impl Into<String>,
        previous: serde_json::Value,
        current: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            change_type: change_type.into(),
            previous,
            current,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SubscriptionAuditLog: Send + Sync {
    /// Append an entry.
    async fn append(&self, entry: SubscriptionAuditEntry) -> Result<(), DomainError>;

    /// Entries for one user, newest first.
    async fn history_for_user(
        &self,
        user_id: &AuthUid,
        limit: i64,
    ) -> Result<Vec<SubscriptionAuditEntry>, DomainError>;
}
