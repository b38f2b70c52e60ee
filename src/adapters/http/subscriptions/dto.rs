//! Request and response DTOs for subscription endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::billing::{AppUser, SubscriptionStatus};
use crate::ports::{SubscriptionAuditEntry, DEFAULT_HISTORY_LIMIT};

/// Largest page the audit endpoint returns.
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Subscription state of the calling user.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription_status: SubscriptionStatus,
    pub has_access: bool,
    pub trial_expires_at: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub plan_id: Option<String>,
}

impl SubscriptionStatusResponse {
    pub fn from_user(user: &AppUser, now: DateTime<Utc>) -> Self {
        Self {
            subscription_status: user.subscription_status,
            has_access: user.has_access(now),
            trial_expires_at: user.trial_expires_at,
            current_period_end: user.current_period_end,
            plan_id: user.plan_id.clone(),
        }
    }
}

/// `?limit=N` on the audit endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditHistoryQuery {
    pub limit: Option<i64>,
}

impl AuditHistoryQuery {
    /// Requested limit clamped to `1..=100`, defaulting to 50.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntryResponse {
    pub change_type: String,
    pub previous: serde_json::Value,
    pub current: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionAuditEntry> for AuditEntryResponse {
    fn from(entry: SubscriptionAuditEntry) -> Self {
        Self {
            change_type: entry.change_type,
            previous: entry.previous,
            current: entry.current,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditHistoryResponse {
    pub entries: Vec<AuditEntryResponse>,
}
