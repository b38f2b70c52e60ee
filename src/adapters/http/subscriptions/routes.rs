//! Axum router for subscription endpoints.

use axum::{routing::get, Router};

use super::handlers::{get_audit_history, get_subscription_status, SubscriptionAppState};

/// Create the subscription API router.
///
/// # Routes
/// - `GET /status` - Current subscription state and access flag
/// - `GET /audit` - Subscription change history, newest first
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/status", get(get_subscription_status))
        .route("/audit", get(get_audit_history))
}
