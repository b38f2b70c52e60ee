//! HTTP adapter for subscription queries.
//!
//! - `GET /api/subscriptions/status` - Subscription state and access flag
//! - `GET /api/subscriptions/audit?limit=N` - Change history, newest first
//!
//! Both require a Bearer access token (see `middleware::auth`).

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::SubscriptionAppState;
pub use routes::subscription_routes;
