//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresWebhookEventLedger` - Webhook idempotency and lifecycle
//! - `PostgresAppUserRepository` - Subscription fields of `app_users`
//! - `PostgresSubscriptionAuditLog` - Append-only subscription audit trail

mod app_user_repository;
mod subscription_audit_log;
mod webhook_event_ledger;

pub use app_user_repository::PostgresAppUserRepository;
pub use subscription_audit_log::PostgresSubscriptionAuditLog;
pub use webhook_event_ledger::PostgresWebhookEventLedger;
