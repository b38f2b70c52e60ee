//! In-memory adapters for tests and local development.
//!
//! Not suitable for production: nothing survives a restart and nothing is
//! shared between processes.

mod app_user_repository;
mod subscription_audit_log;
mod webhook_event_ledger;

pub use app_user_repository::InMemoryAppUserRepository;
pub use subscription_audit_log::InMemorySubscriptionAuditLog;
pub use webhook_event_ledger::InMemoryWebhookEventLedger;
