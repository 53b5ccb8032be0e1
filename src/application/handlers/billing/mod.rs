//! Billing handlers.
//!
//! ## Commands
//! - Ingesting payment-provider webhooks
//!
//! ## Queries
//! - Access status for a user
//! - Failed webhooks awaiting manual reconciliation

mod get_access_status;
mod handle_payment_webhook;
mod list_failed_webhooks;

// Commands
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    ReconcileEffect,
};

// Queries
pub use get_access_status::{GetAccessStatusHandler, GetAccessStatusQuery};
pub use list_failed_webhooks::{
    ListFailedWebhooksHandler, ListFailedWebhooksQuery, DEFAULT_FAILED_LIMIT, MAX_FAILED_LIMIT,
};
