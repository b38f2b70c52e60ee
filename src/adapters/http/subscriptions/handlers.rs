//! HTTP handlers for subscription endpoints.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::adapters::http::error::ErrorResponse;
use crate::adapters::http::middleware::AuthenticatedUser;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AppUserRepository, SubscriptionAuditLog};

use super::dto::{
    AuditEntryResponse, AuditHistoryQuery, AuditHistoryResponse, SubscriptionStatusResponse,
};

/// Shared state for subscription endpoints.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub users: Arc<dyn AppUserRepository>,
    pub audit: Arc<dyn SubscriptionAuditLog>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions/status - Subscription state and access of the caller
pub async fn get_subscription_status(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<Json<SubscriptionStatusResponse>, SubscriptionApiError> {
    let app_user = state
        .users
        .find_by_auth_uid(&user.auth_uid)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "User not found"))?;

    Ok(Json(SubscriptionStatusResponse::from_user(&app_user, Utc::now())))
}

/// GET /api/subscriptions/audit - Subscription change history of the caller
pub async fn get_audit_history(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    Query(query): Query<AuditHistoryQuery>,
) -> Result<Json<AuditHistoryResponse>, SubscriptionApiError> {
    let entries = state
        .audit
        .history_for_user(&user.auth_uid, query.effective_limit())
        .await?;

    Ok(Json(AuditHistoryResponse {
        entries: entries.into_iter().map(AuditEntryResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(DomainError);

impl From<DomainError> for SubscriptionApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::UserNotFound | ErrorCode::WebhookEventNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                tracing::error!(error = %self.0, "Subscription request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.0.message.clone()
        };
        let body = ErrorResponse::new(self.0.code.to_string(), message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAppUserRepository, InMemorySubscriptionAuditLog};
    use crate::domain::billing::{AppUser, SubscriptionStatus};
    use crate::domain::foundation::AuthUid;
    use crate::ports::SubscriptionAuditEntry;
    use serde_json::json;
    use uuid::Uuid;

    fn state(
        users: &InMemoryAppUserRepository,
        audit: &InMemorySubscriptionAuditLog,
    ) -> SubscriptionAppState {
        SubscriptionAppState {
            users: Arc::new(users.clone()),
            audit: Arc::new(audit.clone()),
        }
    }

    #[tokio::test]
    async fn status_of_active_user() {
        let users = InMemoryAppUserRepository::new();
        let audit = InMemorySubscriptionAuditLog::new();
        let mut user = AppUser::new_trial(AuthUid::from_uuid(Uuid::new_v4()), None);
        user.subscription_status = SubscriptionStatus::Active;
        users.insert(user.clone()).await;

        let Json(response) = get_subscription_status(
            State(state(&users, &audit)),
            AuthenticatedUser {
                auth_uid: user.auth_uid,
            },
        )
        .await
        .unwrap();

        assert!(response.has_access);
        assert_eq!(response.subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn status_of_unknown_user_is_not_found() {
        let users = InMemoryAppUserRepository::new();
        let audit = InMemorySubscriptionAuditLog::new();

        let err = get_subscription_status(
            State(state(&users, &audit)),
            AuthenticatedUser {
                auth_uid: AuthUid::from_uuid(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audit_history_respects_limit() {
        let users = InMemoryAppUserRepository::new();
        let audit = InMemorySubscriptionAuditLog::new();
        let uid = AuthUid::from_uuid(Uuid::new_v4());
        for change in ["subscription_created", "payment_failed", "payment_succeeded"] {
            audit
                .append(SubscriptionAuditEntry::new(uid, change, json!({}), json!({})))
                .await
                .unwrap();
        }

        let Json(response) = get_audit_history(
            State(state(&users, &audit)),
            AuthenticatedUser { auth_uid: uid },
            Query(AuditHistoryQuery { limit: Some(1) }),
        )
        .await
        .unwrap();

        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].change_type, "payment_succeeded");
    }
}
