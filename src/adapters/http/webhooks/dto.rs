//! Response body returned to Stripe for every verified webhook.

use serde::Serialize;

use crate::domain::billing::ProcessOutcome;

/// Message sent back when processing failed. Details stay in the ledger.
pub const PROCESSING_FAILED: &str = "Processing failed";

/// Acknowledgement of a verified webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes_applied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAckResponse {
    pub fn from_outcome(event_id: impl Into<String>, outcome: &ProcessOutcome) -> Self {
        let error = outcome
            .is_failed()
            .then(|| PROCESSING_FAILED.to_string());
        let (already_processed, changes_applied) = if outcome.is_failed() {
            (None, None)
        } else {
            (
                Some(outcome.already_processed()),
                Some(outcome.changes_applied()),
            )
        };

        Self {
            received: true,
            event_id: event_id.into(),
            already_processed,
            changes_applied,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::AuthUid;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn processed_reports_changes() {
        let outcome = ProcessOutcome::Processed {
            user_id: AuthUid::from_uuid(Uuid::new_v4()),
        };

        let json = serde_json::to_value(WebhookAckResponse::from_outcome("evt_1", &outcome)).unwrap();

        assert_eq!(
            json,
            json!({"received": true, "event_id": "evt_1", "already_processed": false, "changes_applied": true})
        );
    }

    #[test]
    fn duplicate_reports_already_processed() {
        let ack = WebhookAckResponse::from_outcome("evt_1", &ProcessOutcome::AlreadyProcessed);

        assert_eq!(ack.already_processed, Some(true));
        assert_eq!(ack.changes_applied, Some(false));
        assert!(ack.error.is_none());
    }

    #[test]
    fn ignored_reports_no_changes() {
        let outcome = ProcessOutcome::Ignored {
            reason: "unsupported event type charge.refunded".to_string(),
        };

        let ack = WebhookAckResponse::from_outcome("evt_1", &outcome);

        assert_eq!(ack.already_processed, Some(false));
        assert_eq!(ack.changes_applied, Some(false));
    }

    #[test]
    fn failure_hides_reason() {
        let outcome = ProcessOutcome::Failed {
            reason: "Database error: connection reset".to_string(),
            retryable: true,
        };

        let json = serde_json::to_value(WebhookAckResponse::from_outcome("evt_1", &outcome)).unwrap();

        assert_eq!(
            json,
            json!({"received": true, "event_id": "evt_1", "error": "Processing failed"})
        );
    }
}
