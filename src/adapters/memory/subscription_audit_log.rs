//! In-memory subscription audit log for testing and development.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthUid, DomainError};
use crate::ports::{SubscriptionAuditEntry, SubscriptionAuditLog};

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionAuditLog {
    entries: Arc<RwLock<Vec<SubscriptionAuditEntry>>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemorySubscriptionAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose appends always fail.
    pub fn failing() -> Self {
        let log = Self::default();
        log.fail_appends.store(true, Ordering::SeqCst);
        log
    }

    /// All entries in append order.
    pub async fn entries(&self) -> Vec<SubscriptionAuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl SubscriptionAuditLog for InMemorySubscriptionAuditLog {
    async fn append(&self, entry: SubscriptionAuditEntry) -> Result<(), DomainError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(DomainError::database("audit table unavailable"));
        }
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn history_for_user(
        &self,
        user_id: &AuthUid,
        limit: i64,
    ) -> Result<Vec<SubscriptionAuditEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| &e.user_id == user_id)
            .take(usize::try_from(limit.max(0)).unwrap_or(0))
            .cloned()
            .collect())
    }
}
