//! Webhook error types for Stripe webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The Stripe-Signature header was absent or blank.
    #[error("Missing stripe-signature header")]
    MissingSignature,

    /// Signature verification failed (bad format, mismatch, stale timestamp).
    ///
    /// The reason is diagnostic only and never sent back to the caller.
    #[error("Invalid webhook signature")]
    SignatureInvalid(String),

    /// Payload passed verification but is not a usable event document.
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Processing of a verified event failed downstream.
    #[error("Event processing failed: {message}")]
    EventProcessing { message: String, retryable: bool },

    /// Persistence layer failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Creates a retryable processing error.
    pub fn processing(message: impl Into<String>) -> Self {
        WebhookError::EventProcessing {
            message: message.into(),
            retryable: true,
        }
    }

    /// Returns true if the failure is transient and a redelivery may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::EventProcessing { retryable, .. } => *retryable,
            WebhookError::Database(_) => true,
            WebhookError::MissingSignature
            | WebhookError::SignatureInvalid(_)
            | WebhookError::MalformedPayload(_) => false,
        }
    }

    /// Returns true if the caller must fix its integration (signature gate).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::SignatureInvalid(_)
                | WebhookError::MalformedPayload(_)
        )
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::SignatureInvalid(_) => "INVALID_SIGNATURE",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::EventProcessing { .. } => "PROCESSING_ERROR",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Maps the error to the HTTP status returned to Stripe.
    ///
    /// Only signature gate failures surface as 4xx. Everything downstream is
    /// acknowledged with 200 so a poison event cannot trigger a retry storm;
    /// failed events are tracked in the ledger instead.
    pub fn status_code(&self) -> StatusCode {
        if self.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
