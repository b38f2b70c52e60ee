//! Subscription Sync server binary.

use std::sync::Arc;

use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_sync::adapters::alerting::TracingFailedEventAlerter;
use subscription_sync::adapters::auth::JwtSessionValidator;
use subscription_sync::adapters::http::{
    app_router, AuthState, SubscriptionAppState, WebhookAppState,
};
use subscription_sync::adapters::postgres::{
    PostgresAppUserRepository, PostgresSubscriptionAuditLog, PostgresWebhookEventLedger,
};
use subscription_sync::config::AppConfig;
use subscription_sync::domain::billing::WebhookProcessor;
use subscription_sync::ports::{
    AppUserRepository, SubscriptionAuditLog, WebhookEventLedger,
};

/// Failed events reported at startup.
const FAILED_EVENT_SCAN_LIMIT: i64 = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting subscription-sync"
    );

    if config.payment.is_live_mode() {
        tracing::info!("Stripe live mode");
    } else if config.payment.is_test_mode() {
        tracing::info!("Stripe test mode");
    }

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let ledger: Arc<dyn WebhookEventLedger> =
        Arc::new(PostgresWebhookEventLedger::new(pool.clone()));
    let users: Arc<dyn AppUserRepository> = Arc::new(PostgresAppUserRepository::new(pool.clone()));
    let audit: Arc<dyn SubscriptionAuditLog> =
        Arc::new(PostgresSubscriptionAuditLog::new(pool.clone()));

    report_failed_events(ledger.as_ref()).await;

    let processor = WebhookProcessor::new(
        ledger,
        users.clone(),
        audit.clone(),
        Arc::new(TracingFailedEventAlerter),
    );
    let webhooks = WebhookAppState {
        verifier: Arc::new(config.payment.webhook_verifier()),
        processor: Arc::new(processor),
    };
    let subscriptions = SubscriptionAppState { users, audit };
    let auth: AuthState = Arc::new(JwtSessionValidator::from_config(&config.auth));

    let app = app_router(webhooks, subscriptions, auth)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<http::HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
}

async fn report_failed_events(ledger: &dyn WebhookEventLedger) {
    match ledger.list_failed(FAILED_EVENT_SCAN_LIMIT).await {
        Ok(failed) if failed.is_empty() => {}
        Ok(failed) => {
            tracing::warn!(
                count = failed.len(),
                oldest_event_id = %failed[0].event_id,
                "Failed webhook events awaiting reprocessing"
            );
        }
        Err(e) => tracing::warn!(error = %e, "Could not scan for failed webhook events"),
    }
}
