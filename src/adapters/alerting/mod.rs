//! Failed-event alerting adapters.
//!
//! - `TracingFailedEventAlerter` - emits a structured `error` event for log-based alerting
//! - `RecordingFailedEventAlerter` - collects alerts in memory (tests, local runs)

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::FailedEventAlerter;

/// Alerter that logs at `error` level with the event id and type as fields.
///
/// Log shippers can page on `alert = "webhook_event_failed"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailedEventAlerter;

#[async_trait]
impl FailedEventAlerter for TracingFailedEventAlerter {
    async fn event_failed(&self, event_id: &str, event_type: &str, reason: &str) {
        tracing::error!(
            alert = "webhook_event_failed",
            event_id = %event_id,
            event_type = %event_type,
            reason = %reason,
            "Webhook event failed; ledger row needs manual reprocessing"
        );
    }
}

/// One recorded alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEventAlert {
    pub event_id: String,
    pub event_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFailedEventAlerter {
    alerts: Arc<RwLock<Vec<FailedEventAlert>>>,
}

impl RecordingFailedEventAlerter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn alerts(&self) -> Vec<FailedEventAlert> {
        self.alerts.read().await.clone()
    }
}

#[async_trait]
impl FailedEventAlerter for RecordingFailedEventAlerter {
    async fn event_failed(&self, event_id: &str, event_type: &str, reason: &str) {
        self.alerts.write().await.push(FailedEventAlert {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            reason: reason.to_string(),
        });
    }
}
