//! Webhook processor - Orchestrates idempotent webhook event handling.
//!
//! This module provides the coordination layer between verified Stripe
//! events and the user's subscription state, ensuring each event is applied
//! exactly once.
//!
//! ## Design
//!
//! The processor follows these steps:
//! 1. Check if the event was already seen (idempotency)
//! 2. Log a ledger row with status `processing`
//! 3. Ignore event types outside the supported catalogue
//! 4. Map the event and resolve the affected user by billing customer
//! 5. Apply the update, append an audit entry (best-effort), mark processed
//! 6. On any failure, mark the row failed and raise an alert
//!
//! Every path ends in a [`ProcessOutcome`]; nothing is propagated to the
//! HTTP caller as an error.
//!
//! ## Race Condition Handling
//!
//! When multiple webhook deliveries arrive simultaneously:
//! - First to insert wins (unique constraint on `event_id`)
//! - Others get `AlreadyExists` and return `AlreadyProcessed`
//!
//! ## Ordering
//!
//! Events are applied in arrival order; the last write wins. Event
//! creation time is not compared against stored state.

use std::sync::Arc;

use crate::domain::foundation::AuthUid;
use crate::ports::{
    AppUserRepository, FailedEventAlerter, InsertResult, SubscriptionAuditEntry,
    SubscriptionAuditLog, WebhookEventLedger, WebhookEventRecord,
};

use super::state_mapper::{map_event, MapperOutcome};
use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

/// Terminal outcome of processing one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Subscription fields of this user were updated.
    Processed { user_id: AuthUid },

    /// The event id was already in the ledger; nothing was dispatched.
    AlreadyProcessed,

    /// Acknowledged without changes (unsupported type, unknown customer, ...).
    Ignored { reason: String },

    /// Processing failed; the ledger row is marked failed when one exists.
    Failed { reason: String, retryable: bool },
}

impl ProcessOutcome {
    pub fn already_processed(&self) -> bool {
        matches!(self, Self::AlreadyProcessed)
    }

    pub fn changes_applied(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }

    pub fn user_id(&self) -> Option<AuthUid> {
        match self {
            Self::Processed { user_id } => Some(*user_id),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of the dispatch/apply step, before the ledger is finalized.
enum Dispatched {
    Applied(AuthUid),
    NoChange {
        reason: String,
        user_id: Option<AuthUid>,
    },
}

/// Applies verified Stripe events to subscription state exactly once.
#[derive(Clone)]
pub struct WebhookProcessor {
    ledger: Arc<dyn WebhookEventLedger>,
    users: Arc<dyn AppUserRepository>,
    audit: Arc<dyn SubscriptionAuditLog>,
    alerter: Arc<dyn FailedEventAlerter>,
}

impl WebhookProcessor {
    pub fn new(
        ledger: Arc<dyn WebhookEventLedger>,
        users: Arc<dyn AppUserRepository>,
        audit: Arc<dyn SubscriptionAuditLog>,
        alerter: Arc<dyn FailedEventAlerter>,
    ) -> Self {
        Self {
            ledger,
            users,
            audit,
            alerter,
        }
    }

    /// Process a verified event exactly once.
    pub async fn process(&self, event: &StripeEvent) -> ProcessOutcome {
        // 1. Idempotency check
        match self.ledger.exists(&event.id).await {
            Ok(true) => {
                tracing::info!(event_id = %event.id, "Webhook event already processed");
                return ProcessOutcome::AlreadyProcessed;
            }
            Ok(false) => {}
            Err(e) => return self.failed_before_logging(event, WebhookError::from(e)),
        }

        // 2. Log
        let payload = match event.payload() {
            Ok(payload) => payload,
            Err(e) => {
                return self.failed_before_logging(
                    event,
                    WebhookError::processing(format!("Failed to serialize event: {}", e)),
                )
            }
        };
        let record = WebhookEventRecord::processing(&event.id, &event.event_type, payload);
        match self.ledger.insert(record).await {
            Ok(InsertResult::Inserted) => {}
            Ok(InsertResult::AlreadyExists) => {
                tracing::info!(
                    event_id = %event.id,
                    "Concurrent delivery already logged this webhook event"
                );
                return ProcessOutcome::AlreadyProcessed;
            }
            Err(e) => return self.failed_before_logging(event, WebhookError::from(e)),
        }

        // 3. Type filter
        if !event.parsed_type().is_supported() {
            let reason = format!("unsupported event type {}", event.event_type);
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
            self.finish_processed(&event.id, None).await;
            return ProcessOutcome::Ignored { reason };
        }

        // 4-5. Dispatch and apply
        match self.dispatch(event).await {
            Ok(Dispatched::Applied(user_id)) => {
                self.finish_processed(&event.id, Some(user_id)).await;
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %user_id,
                    livemode = event.is_live(),
                    "Webhook event applied"
                );
                ProcessOutcome::Processed { user_id }
            }
            Ok(Dispatched::NoChange { reason, user_id }) => {
                self.finish_processed(&event.id, user_id).await;
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    reason = %reason,
                    "Webhook event acknowledged without changes"
                );
                ProcessOutcome::Ignored { reason }
            }
            // 6. Failure
            Err(e) => {
                let reason = e.to_string();
                if let Err(mark_err) = self.ledger.mark_failed(&event.id, &reason).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %mark_err,
                        "Failed to mark webhook event as failed"
                    );
                }
                self.alerter
                    .event_failed(&event.id, &event.event_type, &reason)
                    .await;
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Webhook event processing failed"
                );
                ProcessOutcome::Failed {
                    reason,
                    retryable: e.is_retryable(),
                }
            }
        }
    }

    async fn dispatch(&self, event: &StripeEvent) -> Result<Dispatched, WebhookError> {
        let change = match map_event(event)? {
            MapperOutcome::Apply(change) => change,
            MapperOutcome::Skip(reason) => {
                return Ok(Dispatched::NoChange {
                    reason,
                    user_id: None,
                })
            }
        };

        let Some(user) = self.users.find_by_stripe_customer(&change.customer_id).await? else {
            return Ok(Dispatched::NoChange {
                reason: format!("no user linked to customer {}", change.customer_id),
                user_id: None,
            });
        };

        let resolved = change.plan.resolve(&user);
        if resolved.update.is_empty() {
            return Ok(Dispatched::NoChange {
                reason: "event carried no subscription changes".to_string(),
                user_id: Some(user.auth_uid),
            });
        }

        self.users
            .apply_subscription_update(&user.auth_uid, &resolved.update)
            .await?;

        let entry = SubscriptionAuditEntry::new(
            user.auth_uid,
            change.change_type,
            resolved.previous,
            resolved.current,
        );
        if let Err(e) = self.audit.append(entry).await {
            tracing::warn!(
                event_id = %event.id,
                user_id = %user.auth_uid,
                error = %e,
                "Failed to append subscription audit entry"
            );
        }

        Ok(Dispatched::Applied(user.auth_uid))
    }

    async fn finish_processed(&self, event_id: &str, user_id: Option<AuthUid>) {
        if let Err(e) = self.ledger.mark_processed(event_id, user_id).await {
            tracing::error!(
                event_id = %event_id,
                error = %e,
                "Failed to mark webhook event as processed"
            );
        }
    }

    /// Failure with no ledger row to mark.
    fn failed_before_logging(&self, event: &StripeEvent, error: WebhookError) -> ProcessOutcome {
        tracing::error!(
            event_id = %event.id,
            event_type = %event.event_type,
            error = %error,
            "Could not record webhook event in ledger"
        );
        ProcessOutcome::Failed {
            reason: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::RecordingFailedEventAlerter;
    use crate::adapters::memory::{
        InMemoryAppUserRepository, InMemorySubscriptionAuditLog, InMemoryWebhookEventLedger,
    };
    use crate::domain::billing::stripe_event::StripeEventBuilder;
    use crate::domain::billing::{AppUser, SubscriptionStatus};
    use crate::domain::foundation::StripeCustomerId;
    use crate::ports::LedgerStatus;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    const PERIOD_END: i64 = 1_767_225_600;

    struct Harness {
        processor: WebhookProcessor,
        ledger: InMemoryWebhookEventLedger,
        users: InMemoryAppUserRepository,
        audit: InMemorySubscriptionAuditLog,
        alerter: RecordingFailedEventAlerter,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_audit(InMemorySubscriptionAuditLog::new())
        }

        fn with_audit(audit: InMemorySubscriptionAuditLog) -> Self {
            let ledger = InMemoryWebhookEventLedger::new();
            let users = InMemoryAppUserRepository::new();
            let alerter = RecordingFailedEventAlerter::new();
            let processor = WebhookProcessor::new(
                Arc::new(ledger.clone()),
                Arc::new(users.clone()),
                Arc::new(audit.clone()),
                Arc::new(alerter.clone()),
            );
            Self {
                processor,
                ledger,
                users,
                audit,
                alerter,
            }
        }

        async fn seed_trial_user(&self, customer: &str) -> AppUser {
            let mut user = AppUser::new_trial(
                AuthUid::from_uuid(Uuid::new_v4()),
                Some(Utc::now() + Duration::days(7)),
            )
            .with_customer(StripeCustomerId::new(customer).unwrap());
            user.current_period_end = DateTime::from_timestamp(1_700_000_000, 0);
            self.users.insert(user.clone()).await;
            user
        }

        async fn ledger_status(&self, event_id: &str) -> Option<LedgerStatus> {
            self.ledger
                .find_by_event_id(event_id)
                .await
                .unwrap()
                .map(|r| r.status)
        }
    }

    fn subscription_created(id: &str, customer: &str) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type("customer.subscription.created")
            .object(json!({
                "id": "sub_1",
                "customer": customer,
                "status": "active",
                "current_period_end": PERIOD_END,
                "items": {"data": [{"price": {"id": "price_pro"}}]}
            }))
            .build()
    }

    fn subscription_updated(id: &str, customer: &str, status: &str) -> StripeEvent {
        StripeEventBuilder::new()
            .id(id)
            .event_type("customer.subscription.updated")
            .object(json!({"id": "sub_1", "customer": customer, "status": status}))
            .build()
    }

    // ══════════════════════════════════════════════════════════════
    // Happy path
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn ledger_stores_the_verified_body_unchanged() {
        let h = Harness::new();
        let body = br#"{"id":"evt_body","object":"event","type":"charge.refunded","created":1735689600,"request":{"id":"req_9","idempotency_key":null},"pending_webhooks":1,"data":{"object":{"id":"ch_1"}}}"#;
        let event = StripeEvent::from_body(body).unwrap();

        h.processor.process(&event).await;

        let row = h.ledger.find_by_event_id("evt_body").await.unwrap().unwrap();
        let expected: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(row.payload, expected);
        assert!(row.payload.get("api_version").is_none());
    }

    #[tokio::test]
    async fn created_event_activates_user_and_records_everything() {
        let h = Harness::new();
        let user = h.seed_trial_user("cus_1").await;

        let outcome = h.processor.process(&subscription_created("evt_1", "cus_1")).await;

        assert_eq!(outcome, ProcessOutcome::Processed { user_id: user.auth_uid });
        assert!(outcome.changes_applied());
        assert!(!outcome.already_processed());

        let stored = h.users.get(&user.auth_uid).await.unwrap();
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);
        assert!(stored.trial_expires_at.is_none());

        let row = h.ledger.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(row.status, LedgerStatus::Processed);
        assert_eq!(row.user_id, Some(user.auth_uid));
        assert_eq!(row.payload["id"], "evt_1");

        let entries = h.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].change_type, "subscription_created");
        assert_eq!(entries[0].previous["subscription_status"], "trial");
        assert_eq!(entries[0].current["subscription_status"], "active");
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotency
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_delivery_is_applied_once() {
        let h = Harness::new();
        h.seed_trial_user("cus_1").await;
        let event = subscription_created("evt_1", "cus_1");

        let first = h.processor.process(&event).await;
        let second = h.processor.process(&event).await;

        assert!(first.changes_applied());
        assert_eq!(second, ProcessOutcome::AlreadyProcessed);
        assert!(second.already_processed());
        assert!(!second.changes_applied());
        assert_eq!(h.ledger.len().await, 1);
        assert_eq!(h.users.updates_applied(), 1);
        assert_eq!(h.audit.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_delivery_is_applied_once() {
        let h = Harness::new();
        h.seed_trial_user("cus_1").await;
        let event = subscription_created("evt_1", "cus_1");

        let (a, b) = tokio::join!(h.processor.process(&event), h.processor.process(&event));

        let applied = [&a, &b].iter().filter(|o| o.changes_applied()).count();
        let duplicates = [&a, &b].iter().filter(|o| o.already_processed()).count();
        assert_eq!(applied, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(h.ledger.len().await, 1);
        assert_eq!(h.users.updates_applied(), 1);
    }

    #[tokio::test]
    async fn failed_event_is_not_redispatched_on_redelivery() {
        let h = Harness::new();
        h.seed_trial_user("cus_1").await;
        h.users.fail_updates(true);
        let event = subscription_created("evt_1", "cus_1");

        let first = h.processor.process(&event).await;
        h.users.fail_updates(false);
        let second = h.processor.process(&event).await;

        assert!(first.is_failed());
        assert!(second.already_processed());
        assert_eq!(h.users.updates_applied(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // No-op outcomes
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unsupported_event_type_is_marked_processed_without_changes() {
        let h = Harness::new();
        let user = h.seed_trial_user("cus_1").await;
        let event = StripeEventBuilder::new()
            .id("evt_refund")
            .event_type("charge.refunded")
            .object(json!({"id": "ch_1", "customer": "cus_1"}))
            .build();

        let outcome = h.processor.process(&event).await;

        assert!(matches!(outcome, ProcessOutcome::Ignored { .. }));
        assert!(!outcome.changes_applied());
        assert_eq!(h.ledger_status("evt_refund").await, Some(LedgerStatus::Processed));
        assert_eq!(h.users.get(&user.auth_uid).await.unwrap(), user);
        assert_eq!(h.users.updates_applied(), 0);
    }

    #[tokio::test]
    async fn unknown_customer_is_processed_not_failed() {
        let h = Harness::new();

        let outcome = h
            .processor
            .process(&subscription_updated("evt_1", "cus_nobody", "active"))
            .await;

        assert!(matches!(outcome, ProcessOutcome::Ignored { .. }));
        assert_eq!(h.ledger_status("evt_1").await, Some(LedgerStatus::Processed));
        assert!(h.ledger.list_failed(10).await.unwrap().is_empty());
        assert!(h.alerter.alerts().await.is_empty());
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_ignored() {
        let h = Harness::new();
        let user = h.seed_trial_user("cus_1").await;
        let event = StripeEventBuilder::new()
            .id("evt_inv")
            .event_type("invoice.payment_failed")
            .object(json!({"id": "in_1", "customer": "cus_1"}))
            .build();

        let outcome = h.processor.process(&event).await;

        assert!(matches!(outcome, ProcessOutcome::Ignored { .. }));
        assert_eq!(h.users.get(&user.auth_uid).await.unwrap(), user);
    }

    #[tokio::test]
    async fn unmapped_status_without_other_fields_writes_nothing() {
        let h = Harness::new();
        let user = h.seed_trial_user("cus_1").await;

        let outcome = h
            .processor
            .process(&subscription_updated("evt_1", "cus_1", "incomplete"))
            .await;

        assert!(matches!(outcome, ProcessOutcome::Ignored { .. }));
        assert_eq!(h.users.updates_applied(), 0);
        let row = h.ledger.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(row.user_id, Some(user.auth_uid));
    }

    // ══════════════════════════════════════════════════════════════
    // Failure handling
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn audit_failure_does_not_undo_update() {
        let h = Harness::with_audit(InMemorySubscriptionAuditLog::failing());
        let user = h.seed_trial_user("cus_1").await;

        let outcome = h.processor.process(&subscription_created("evt_1", "cus_1")).await;

        assert_eq!(outcome, ProcessOutcome::Processed { user_id: user.auth_uid });
        let stored = h.users.get(&user.auth_uid).await.unwrap();
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);
        assert_eq!(h.ledger_status("evt_1").await, Some(LedgerStatus::Processed));
        assert!(h.alerter.alerts().await.is_empty());
    }

    #[tokio::test]
    async fn update_failure_marks_row_failed_and_alerts() {
        let h = Harness::new();
        h.seed_trial_user("cus_1").await;
        h.users.fail_updates(true);

        let outcome = h.processor.process(&subscription_created("evt_1", "cus_1")).await;

        match &outcome {
            ProcessOutcome::Failed { retryable, .. } => assert!(*retryable),
            other => panic!("expected failure, got {:?}", other),
        }
        let row = h.ledger.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(row.status, LedgerStatus::Failed);
        assert!(row.error.as_deref().unwrap_or_default().contains("connection reset"));

        let alerts = h.alerter.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].event_id, "evt_1");
        assert_eq!(alerts[0].event_type, "customer.subscription.created");
        assert!(h.audit.entries().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_object_fails_without_retry() {
        let h = Harness::new();
        let event = StripeEventBuilder::new()
            .id("evt_bad")
            .event_type("customer.subscription.deleted")
            .object(json!({"id": "sub_1"}))
            .build();

        let outcome = h.processor.process(&event).await;

        assert!(
            matches!(outcome, ProcessOutcome::Failed { retryable: false, .. }),
            "expected non-retryable failure, got {:?}",
            outcome
        );
        assert_eq!(h.ledger_status("evt_bad").await, Some(LedgerStatus::Failed));
    }

    // ══════════════════════════════════════════════════════════════
    // Mapping through the full pipeline
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_failed_only_changes_status() {
        let h = Harness::new();
        let mut user = h.seed_trial_user("cus_1").await;
        user.subscription_status = SubscriptionStatus::Active;
        user.trial_expires_at = None;
        h.users.insert(user.clone()).await;
        let event = StripeEventBuilder::new()
            .id("evt_pf")
            .event_type("invoice.payment_failed")
            .object(json!({
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "lines": {"data": [{"period": {"end": PERIOD_END}}]}
            }))
            .build();

        h.processor.process(&event).await;

        let stored = h.users.get(&user.auth_uid).await.unwrap();
        let mut expected = user.clone();
        expected.subscription_status = SubscriptionStatus::PastDue;
        assert_eq!(stored, expected);
        assert_eq!(h.audit.entries().await[0].change_type, "payment_failed");
    }

    #[tokio::test]
    async fn deleted_then_succeeded_reactivates_user() {
        let h = Harness::new();
        let user = h.seed_trial_user("cus_1").await;
        let deleted = StripeEventBuilder::new()
            .id("evt_del")
            .event_type("customer.subscription.deleted")
            .object(json!({"id": "sub_1", "customer": "cus_1", "status": "canceled", "canceled_at": PERIOD_END}))
            .build();
        let paid = StripeEventBuilder::new()
            .id("evt_paid")
            .event_type("invoice.payment_succeeded")
            .object(json!({"id": "in_1", "customer": "cus_1", "subscription": "sub_2"}))
            .build();

        h.processor.process(&deleted).await;
        let after_delete = h.users.get(&user.auth_uid).await.unwrap();
        h.processor.process(&paid).await;
        let after_paid = h.users.get(&user.auth_uid).await.unwrap();

        assert_eq!(after_delete.subscription_status, SubscriptionStatus::Canceled);
        assert_eq!(after_delete.current_period_end, DateTime::from_timestamp(PERIOD_END, 0));
        assert_eq!(after_paid.subscription_status, SubscriptionStatus::Active);
        assert_eq!(after_paid.current_period_end, after_delete.current_period_end);
        let types: Vec<_> = h
            .audit
            .entries()
            .await
            .into_iter()
            .map(|e| e.change_type)
            .collect();
        assert_eq!(types, vec!["subscription_canceled", "payment_succeeded"]);
    }
}
