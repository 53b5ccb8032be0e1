//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.

use serde::{Deserialize, Serialize};

use crate::application::{HandlePaymentWebhookResult, ReconcileEffect};
use crate::domain::billing::{AccessDecision, AccessStatus, Grant, LedgerEntry};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Query string for the failed-webhook listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailedWebhooksParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAckResponse {
    pub received: bool,
    pub event_id: String,
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl From<HandlePaymentWebhookResult> for WebhookAckResponse {
    fn from(result: HandlePaymentWebhookResult) -> Self {
        match result {
            HandlePaymentWebhookResult::Processed {
                provider_event_id,
                effect,
                ..
            } => Self {
                received: true,
                event_id: provider_event_id,
                duplicate: false,
                outcome: Some(effect_label(&effect).to_string()),
            },
            HandlePaymentWebhookResult::Duplicate {
                provider_event_id, ..
            } => Self {
                received: true,
                event_id: provider_event_id,
                duplicate: true,
                outcome: None,
            },
        }
    }
}

fn effect_label(effect: &ReconcileEffect) -> &'static str {
    match effect {
        ReconcileEffect::SubscriptionUpserted { .. } => "subscription_upserted",
        ReconcileEffect::SubscriptionMissing { .. } => "subscription_missing",
        ReconcileEffect::PaymentUpserted { .. } => "payment_upserted",
        ReconcileEffect::OrderNotPaid { .. } => "order_not_paid",
        ReconcileEffect::UnattributedPayment { .. } => "unattributed_payment",
        ReconcileEffect::PaymentOwnerUnknown { .. } => "payment_owner_unknown",
        ReconcileEffect::Acknowledged => "acknowledged",
        ReconcileEffect::Ignored { .. } => "ignored",
    }
}

/// Access decision with the record behind it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatusResponse {
    #[serde(flatten)]
    pub status: AccessStatus,
    pub grant: Option<Grant>,
    pub expires_at: Option<Timestamp>,
}

impl From<AccessDecision> for BillingStatusResponse {
    fn from(decision: AccessDecision) -> Self {
        Self {
            status: decision.status,
            grant: decision.grant,
            expires_at: decision.expires_at,
        }
    }
}

/// One failed ledger entry for operators.
///
/// The stored payload is left out: it carries another customer's data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWebhookResponse {
    pub provider_event_id: String,
    pub event_type: String,
    pub received_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl From<LedgerEntry> for FailedWebhookResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            provider_event_id: entry.provider_event_id,
            event_type: entry.event_type,
            received_at: entry.received_at,
            processed_at: entry.processed_at,
            error_message: entry.error_message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedWebhooksResponse {
    pub items: Vec<FailedWebhookResponse>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
