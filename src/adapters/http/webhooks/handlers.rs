//! HTTP handler for inbound Stripe webhooks.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use crate::adapters::http::error::ErrorResponse;
use crate::domain::billing::{StripeWebhookVerifier, WebhookError, WebhookProcessor};

use super::dto::WebhookAckResponse;

/// Header carrying `t=...,v1=...`.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Shared state for webhook endpoints.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<StripeWebhookVerifier>,
    pub processor: Arc<WebhookProcessor>,
}

/// POST /api/webhooks/stripe - Verify and apply a Stripe event
///
/// The body is taken as raw bytes; it must not be parsed before the
/// signature check. Only signature-gate failures produce a non-200 status.
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    let signature = match headers.get(STRIPE_SIGNATURE_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            WebhookError::SignatureInvalid("signature header is not visible ASCII".to_string())
        })?),
        None => None,
    };

    let event = state.verifier.verify_and_parse(&body, signature)?;

    let outcome = state.processor.process(&event).await;

    Ok(Json(WebhookAckResponse::from_outcome(&event.id, &outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts signature-gate errors into HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        match &self.0 {
            WebhookError::SignatureInvalid(reason) => {
                tracing::warn!(reason = %reason, "Rejected webhook with invalid signature");
            }
            other => tracing::warn!(error = %other, "Rejected webhook"),
        }

        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (self.0.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::RecordingFailedEventAlerter;
    use crate::adapters::memory::{
        InMemoryAppUserRepository, InMemorySubscriptionAuditLog, InMemoryWebhookEventLedger,
    };
    use crate::domain::billing::sign_payload;
    use crate::ports::WebhookEventLedger;
    use axum::http::{HeaderValue, StatusCode};
    use secrecy::SecretString;

    const SECRET: &str = "whsec_handler_test";

    fn state(ledger: InMemoryWebhookEventLedger) -> WebhookAppState {
        WebhookAppState {
            verifier: Arc::new(StripeWebhookVerifier::new(SecretString::new(
                SECRET.to_string(),
            ))),
            processor: Arc::new(WebhookProcessor::new(
                Arc::new(ledger),
                Arc::new(InMemoryAppUserRepository::new()),
                Arc::new(InMemorySubscriptionAuditLog::new()),
                Arc::new(RecordingFailedEventAlerter::new()),
            )),
        }
    }

    fn body() -> Bytes {
        Bytes::from_static(
            br#"{"id":"evt_h1","type":"charge.refunded","created":1735689600,"data":{"object":{"id":"ch_1"}}}"#,
        )
    }

    fn signed_headers(payload: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let header = sign_payload(SECRET, chrono::Utc::now().timestamp(), payload);
        headers.insert(STRIPE_SIGNATURE_HEADER, HeaderValue::from_str(&header).unwrap());
        headers
    }

    #[tokio::test]
    async fn verified_event_is_acknowledged() {
        let ledger = InMemoryWebhookEventLedger::new();
        let payload = body();

        let Json(ack) = handle_stripe_webhook(
            State(state(ledger.clone())),
            signed_headers(&payload),
            payload,
        )
        .await
        .unwrap();

        assert!(ack.received);
        assert_eq!(ack.event_id, "evt_h1");
        assert_eq!(ack.changes_applied, Some(false));
        assert!(ledger.exists("evt_h1").await.unwrap());
    }

    #[tokio::test]
    async fn missing_header_is_bad_request() {
        let ledger = InMemoryWebhookEventLedger::new();

        let err = handle_stripe_webhook(State(state(ledger.clone())), HeaderMap::new(), body())
            .await
            .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn tampered_body_is_bad_request_without_ledger_row() {
        let ledger = InMemoryWebhookEventLedger::new();
        let headers = signed_headers(&body());
        let tampered = Bytes::from_static(
            br#"{"id":"evt_h1","type":"charge.refunded","created":1735689600,"data":{"object":{"id":"ch_2"}}}"#,
        );

        let err = handle_stripe_webhook(State(state(ledger.clone())), headers, tampered)
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(ledger.is_empty().await);
    }
}
