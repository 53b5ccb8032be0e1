//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    GetAccessStatusHandler, GetAccessStatusQuery, HandlePaymentWebhookCommand,
    HandlePaymentWebhookHandler, ListFailedWebhooksHandler, ListFailedWebhooksQuery,
};
use crate::domain::billing::{
    BillingError, EntitlementPolicy, PolarWebhookVerifier, ProductCatalog, WebhookError,
    HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use crate::domain::foundation::UserId;
use crate::ports::{OwnerDirectory, PaymentRepository, SubscriptionRepository, WebhookEventRepository};

use super::dto::{
    BillingStatusResponse, ErrorResponse, FailedWebhookResponse, FailedWebhooksParams,
    FailedWebhooksResponse, HealthResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every port is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub ledger: Arc<dyn WebhookEventRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub owners: Arc<dyn OwnerDirectory>,
    pub verifier: PolarWebhookVerifier,
    pub catalog: ProductCatalog,
    pub policy: EntitlementPolicy,
}

impl BillingAppState {
    pub fn webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            self.verifier.clone(),
            self.ledger.clone(),
            self.subscriptions.clone(),
            self.payments.clone(),
            self.owners.clone(),
            self.catalog.clone(),
        )
    }

    pub fn access_handler(&self) -> GetAccessStatusHandler {
        GetAccessStatusHandler::new(self.subscriptions.clone(), self.payments.clone(), self.policy)
    }

    pub fn failed_webhooks_handler(&self) -> ListFailedWebhooksHandler {
        ListFailedWebhooksHandler::new(self.ledger.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity, set by the gateway in front of this service.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/webhooks/polar - Ingest a Polar webhook delivery
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_polar_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = HandlePaymentWebhookCommand {
        webhook_id: header(&headers, HEADER_ID),
        webhook_timestamp: header(&headers, HEADER_TIMESTAMP),
        webhook_signature: header(&headers, HEADER_SIGNATURE),
        payload: body.to_vec(),
    };

    let result = state.webhook_handler().handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/access - Access status for the caller
pub async fn get_access(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let decision = state
        .access_handler()
        .handle(GetAccessStatusQuery::now(user.user_id))
        .await?;

    Ok(Json(decision.status))
}

/// GET /api/billing/status - Access status with the granting record
pub async fn get_billing_status(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let decision = state
        .access_handler()
        .handle(GetAccessStatusQuery::now(user.user_id))
        .await?;

    Ok(Json(BillingStatusResponse::from(decision)))
}

/// GET /api/billing/webhooks/failed - Failed deliveries awaiting reconciliation
pub async fn list_failed_webhooks(
    State(state): State<BillingAppState>,
    _user: AuthenticatedUser, // operator role is enforced by the gateway
    Query(params): Query<FailedWebhooksParams>,
) -> Result<impl IntoResponse, BillingApiError> {
    let entries = state
        .failed_webhooks_handler()
        .handle(ListFailedWebhooksQuery {
            limit: params.limit,
        })
        .await?;

    let items: Vec<FailedWebhookResponse> = entries.into_iter().map(Into::into).collect();
    Ok(Json(FailedWebhooksResponse {
        count: items.len(),
        items,
    }))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Webhook failures as HTTP responses; the status tells the provider
/// whether to redeliver.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// API error type for the read endpoints.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            BillingError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            BillingError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}
