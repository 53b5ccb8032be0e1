//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_access, get_billing_status, handle_polar_webhook, health, list_failed_webhooks,
    BillingAppState,
};

/// Caller-facing billing routes.
///
/// # Routes
/// - `GET /access` - Access status for the caller
/// - `GET /status` - Access status with the granting record
/// - `GET /webhooks/failed` - Failed deliveries (operators)
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/access", get(get_access))
        .route("/status", get(get_billing_status))
        .route("/webhooks/failed", get(list_failed_webhooks))
}

/// Provider webhook routes.
///
/// Separate from the billing routes because deliveries carry no user
/// identity; they are authenticated by signature.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/polar", post(handle_polar_webhook))
}

/// Complete router: `/api/billing/*`, `/api/webhooks/*` and `/health`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/api/billing", billing_routes())
        .nest("/api/webhooks", webhook_routes())
        .route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::{
        InMemoryOwnerDirectory, InMemoryPaymentRepository, InMemorySubscriptionRepository,
        InMemoryWebhookEventRepository,
    };
    use crate::domain::billing::{EntitlementPolicy, PolarWebhookVerifier, ProductCatalog};

    fn test_state() -> BillingAppState {
        BillingAppState {
            ledger: Arc::new(InMemoryWebhookEventRepository::new()),
            subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
            payments: Arc::new(InMemoryPaymentRepository::new()),
            owners: Arc::new(InMemoryOwnerDirectory::new()),
            verifier: PolarWebhookVerifier::new("secret").unwrap(),
            catalog: ProductCatalog::new(),
            policy: EntitlementPolicy::default(),
        }
    }

    #[test]
    fn billing_routes_creates_router() {
        let _: Router<()> = billing_routes().with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let _: Router<()> = webhook_routes().with_state(test_state());
    }

    #[test]
    fn billing_router_creates_combined_router() {
        let _: Router<()> = billing_router().with_state(test_state());
    }
}
