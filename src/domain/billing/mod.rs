//! Billing domain - Stripe webhook ingestion and subscription state.
//!
//! - `webhook_verifier` - Stripe signature verification on raw bytes
//! - `state_mapper` - Pure translation of events into subscription changes
//! - `webhook_processor` - Idempotent orchestration over the ledger, user
//!   store and audit log

mod app_user;
pub mod state_mapper;
mod status;
mod stripe_event;
mod webhook_errors;
mod webhook_processor;
mod webhook_verifier;

pub use app_user::{AppUser, SubscriptionUpdate};
pub use state_mapper::{
    map_event, FieldPlan, MapperOutcome, PlannedUpdate, ResolvedChange, SubscriptionChange,
};
pub use status::SubscriptionStatus;
pub use stripe_event::{
    StripeEvent, StripeEventData, StripeEventType, StripeInvoice, StripeSubscription,
};
pub use webhook_errors::WebhookError;
pub use webhook_processor::{ProcessOutcome, WebhookProcessor};
pub use webhook_verifier::{
    sign_payload, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
};
