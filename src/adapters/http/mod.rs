//! HTTP adapters - REST API implementations.
//!
//! - `webhooks` - Stripe webhook receiver (authenticated by signature)
//! - `subscriptions` - Subscription status and audit queries (Bearer token)
//! - `middleware` - Bearer token authentication

pub mod error;
pub mod middleware;
pub mod subscriptions;
pub mod webhooks;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub use middleware::AuthState;
pub use subscriptions::{subscription_routes, SubscriptionAppState};
pub use webhooks::{webhook_routes, WebhookAppState};

/// Assemble the full application router.
///
/// # Routes
/// - `POST /api/webhooks/stripe`
/// - `GET /api/subscriptions/status`
/// - `GET /api/subscriptions/audit`
/// - `GET /health`
pub fn app_router(
    webhooks: WebhookAppState,
    subscriptions: SubscriptionAppState,
    auth: AuthState,
) -> Router {
    let subscription_api = subscription_routes()
        .route_layer(axum::middleware::from_fn_with_state(
            auth,
            middleware::auth_middleware,
        ))
        .with_state(subscriptions);

    Router::new()
        .nest("/api/webhooks", webhook_routes().with_state(webhooks))
        .nest("/api/subscriptions", subscription_api)
        .route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
