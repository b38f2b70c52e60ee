//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Webhook Ports
//!
//! - `WebhookEventLedger` - Idempotency and lifecycle of received events
//! - `FailedEventAlerter` - Notification hook for failed events
//!
//! ## Subscription Ports
//!
//! - `AppUserRepository` - Subscription fields of application users
//! - `SubscriptionAuditLog` - Append-only trail of subscription changes
//!
//! ## Auth Ports
//!
//! - `SessionValidator` - Access token validation for query endpoints

mod app_user_repository;
mod failed_event_alerter;
mod session_validator;
mod subscription_audit_log;
mod webhook_event_ledger;

pub use app_user_repository::AppUserRepository;
pub use failed_event_alerter::FailedEventAlerter;
pub use session_validator::SessionValidator;
pub use subscription_audit_log::{
    SubscriptionAuditEntry, SubscriptionAuditLog, DEFAULT_HISTORY_LIMIT,
};
pub use webhook_event_ledger::{InsertResult, LedgerStatus, WebhookEventLedger, WebhookEventRecord};
