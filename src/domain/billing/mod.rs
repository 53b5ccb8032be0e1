//! Billing domain module.
//!
//! Payment-provider webhooks, the records they reconcile into, and the
//! access decision derived from those records.
//!
//! # Module Structure
//!
//! - `webhook_verifier` - Standard Webhooks signature check
//! - `billing_event` - envelope parsing and the closed event enum
//! - `ledger` - received-event ledger entries and their state machine
//! - `subscription` / `payment` - reconciled records
//! - `product_catalog` - product id classification
//! - `reconciler` - pure record transitions per event
//! - `entitlement` - pure access resolution

mod billing_event;
mod entitlement;
mod errors;
mod ledger;
mod payment;
mod product_catalog;
mod reconciler;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use billing_event::{
    BillingEvent, EventIdSource, EventKind, OrderPayload, SubscriptionChange, SubscriptionPayload,
    WebhookEnvelope,
};
pub use entitlement::{
    resolve, AccessDecision, AccessStatus, EntitlementPolicy, Grant, Tier,
    DEFAULT_FIXED_TERM_DAYS,
};
pub use errors::BillingError;
pub use ledger::{LedgerEntry, ProcessingStatus};
pub use payment::{Payment, ProductType, ACCEPTED_PAYMENT_STATUSES};
pub use product_catalog::ProductCatalog;
pub use reconciler::{reconcile_order, reconcile_subscription_change, reconcile_subscription_created};
pub use subscription::{Subscription, ENTITLING_STATUSES};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    PolarWebhookVerifier, VerifiedWebhook, WebhookHeaders, DEFAULT_TOLERANCE_SECS, HEADER_ID,
    HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
