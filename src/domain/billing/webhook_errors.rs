//! Webhook processing errors.
//!
//! Every failure the ingestion pipeline can produce, with the HTTP status
//! the provider receives and whether it should redeliver.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that can occur while ingesting a payment-provider webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required signing header was absent.
    #[error("Missing webhook header: {0}")]
    MissingHeader(&'static str),

    /// No signature entry matched the computed signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Timestamp is outside the accepted tolerance window.
    #[error("Webhook timestamp outside tolerance window")]
    TimestampOutOfRange,

    /// Timestamp header is not a Unix seconds value.
    #[error("Invalid timestamp in webhook headers")]
    InvalidTimestamp,

    /// The configured signing secret could not be decoded.
    #[error("Webhook signing secret is malformed: {0}")]
    InvalidSecret(String),

    /// Body is not a JSON webhook envelope.
    #[error("Failed to parse webhook payload: {0}")]
    ParseError(String),

    /// No identifier could be derived for deduplication.
    #[error("Webhook carries no event identifier")]
    MissingEventId,

    /// Envelope parsed but its `data` does not fit the event kind.
    #[error("Malformed {event_type} data: {reason}")]
    MalformedEvent { event_type: String, reason: String },

    /// A `subscription.created` names a user the platform does not know.
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    /// An order's product could not be classified.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// Ledger entry was not in a state that allows the requested change.
    #[error("Invalid ledger transition: {0}")]
    InvalidTransition(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True for errors raised before anything is persisted because the
    /// request could not be authenticated.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingHeader(_)
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Returns true if the provider should retry delivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::OwnerNotFound(_)
        )
    }

    /// HTTP status code returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => StatusCode::FORBIDDEN,

            WebhookError::ParseError(_) | WebhookError::MissingEventId => StatusCode::BAD_REQUEST,

            WebhookError::MalformedEvent { .. } | WebhookError::UnknownProduct(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            WebhookError::InvalidTransition(_) => StatusCode::CONFLICT,

            WebhookError::OwnerNotFound(_)
            | WebhookError::InvalidSecret(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => "AUTHENTICATION_FAILED",
            WebhookError::InvalidSecret(_) => "MISCONFIGURED",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::MissingEventId => "MISSING_EVENT_ID",
            WebhookError::MalformedEvent { .. } => "MALFORMED_EVENT",
            WebhookError::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            WebhookError::UnknownProduct(_) => "UNKNOWN_PRODUCT",
            WebhookError::InvalidTransition(_) => "INVALID_TRANSITION",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition | ErrorCode::WebhookEventNotFound => {
                WebhookError::InvalidTransition(err.to_string())
            }
            _ => WebhookError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Authentication failures
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn signature_failures_map_to_forbidden() {
        for err in [
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidTimestamp,
            WebhookError::MissingHeader("webhook-id"),
        ] {
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
            assert!(err.is_authentication_failure());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn missing_header_names_the_header() {
        let err = WebhookError::MissingHeader("webhook-signature");
        assert!(err.to_string().contains("webhook-signature"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Client errors
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_error_is_bad_request() {
        let err = WebhookError::ParseError("expected value at line 1".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn unknown_product_is_unprocessable_and_not_retried() {
        let err = WebhookError::UnknownProduct("prod_x".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.is_retryable());
    }

    #[test]
    fn malformed_event_mentions_type() {
        let err = WebhookError::MalformedEvent {
            event_type: "order.created".to_string(),
            reason: "missing field `id`".to_string(),
        };
        assert!(err.to_string().contains("order.created"));
        assert_eq!(err.code(), "MALFORMED_EVENT");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Retryable errors
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn owner_not_found_is_retried() {
        let err = WebhookError::OwnerNotFound("u9".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_error_converts_to_database() {
        let err: WebhookError = DomainError::new(ErrorCode::DatabaseError, "pool timed out").into();
        assert!(matches!(err, WebhookError::Database(ref m) if m.contains("pool timed out")));
        assert!(err.is_retryable());
    }

    #[test]
    fn ledger_state_errors_are_not_retried() {
        for code in [ErrorCode::InvalidStateTransition, ErrorCode::WebhookEventNotFound] {
            let err: WebhookError = DomainError::new(code, "entry evt_1 is completed").into();
            assert!(matches!(err, WebhookError::InvalidTransition(_)));
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
            assert!(!err.is_retryable());
        }
    }
}
