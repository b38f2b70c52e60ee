//! HTTP adapter for payment-provider webhooks.
//!
//! - `POST /api/webhooks/stripe` - Verify, record and apply a Stripe event

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::WebhookAckResponse;
pub use handlers::{WebhookAppState, STRIPE_SIGNATURE_HEADER};
pub use routes::webhook_routes;
