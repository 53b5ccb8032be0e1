//! HandlePaymentWebhookHandler - Command handler for Polar webhook deliveries.
//!
//! verify → parse → resolve event id → admit to ledger → dispatch →
//! mark Completed, or mark Failed and return the error.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::billing::{
    reconcile_order, reconcile_subscription_change, reconcile_subscription_created, BillingEvent,
    EventIdSource, LedgerEntry, OrderPayload, PolarWebhookVerifier, ProcessingStatus,
    ProductCatalog, SubscriptionChange, SubscriptionPayload, WebhookEnvelope, WebhookError,
    WebhookHeaders,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{
    AdmitResult, OwnerDirectory, PaymentRepository, SubscriptionRepository,
    WebhookEventRepository,
};

/// Command to ingest one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    pub webhook_id: Option<String>,
    pub webhook_timestamp: Option<String>,
    pub webhook_signature: Option<String>,
    /// Raw body exactly as received.
    pub payload: Vec<u8>,
}

/// What reconciliation did with an admitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEffect {
    SubscriptionUpserted { external_subscription_id: String },
    /// Lifecycle event for a subscription never created here.
    SubscriptionMissing { external_subscription_id: String },
    PaymentUpserted { external_payment_id: String },
    OrderNotPaid { external_payment_id: String },
    /// Paid order without `metadata.userId`.
    UnattributedPayment { external_payment_id: String },
    /// Paid order naming a user the platform does not know.
    PaymentOwnerUnknown { external_payment_id: String, user_id: String },
    /// Known event with no effect by design.
    Acknowledged,
    /// Event type not handled.
    Ignored { event_type: String },
}

/// Result of webhook ingestion. Both variants are answered with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentWebhookResult {
    Processed {
        provider_event_id: String,
        event_type: String,
        effect: ReconcileEffect,
    },
    Duplicate {
        provider_event_id: String,
        status: ProcessingStatus,
    },
}

/// Handler for payment-provider webhooks.
pub struct HandlePaymentWebhookHandler {
    verifier: PolarWebhookVerifier,
    ledger: Arc<dyn WebhookEventRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    owners: Arc<dyn OwnerDirectory>,
    catalog: ProductCatalog,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        verifier: PolarWebhookVerifier,
        ledger: Arc<dyn WebhookEventRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        owners: Arc<dyn OwnerDirectory>,
        catalog: ProductCatalog,
    ) -> Self {
        Self {
            verifier,
            ledger,
            subscriptions,
            payments,
            owners,
            catalog,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        // 1. Authenticate; nothing is stored for a delivery that fails here
        let headers = WebhookHeaders::new(
            cmd.webhook_id.as_deref(),
            cmd.webhook_timestamp.as_deref(),
            cmd.webhook_signature.as_deref(),
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected webhook: missing signing header");
            e
        })?;

        let verified = self
            .verifier
            .verify_and_parse(&headers, &cmd.payload)
            .map_err(|e| {
                warn!(webhook_id = %headers.id, error = %e, "Rejected webhook");
                e
            })?;

        let envelope = verified.envelope;
        let event_type = envelope.event_type.clone();

        // 2. Dedup key
        let (provider_event_id, source) = envelope
            .provider_event_id(Some(&verified.webhook_id))
            .ok_or(WebhookError::MissingEventId)?;
        if source != EventIdSource::Header {
            warn!(
                event_id = %provider_event_id,
                source = ?source,
                "Webhook id header absent, deduplicating on payload id"
            );
        }

        // 3. Admit
        let now = Timestamp::now();
        let entry = LedgerEntry::admitted(&provider_event_id, &event_type, verified.raw, now);
        match self.ledger.admit(entry).await? {
            AdmitResult::Admitted => {
                info!(event_id = %provider_event_id, event_type = %event_type, "Webhook admitted");
            }
            AdmitResult::AlreadySeen(status) => {
                if status == ProcessingStatus::Failed {
                    warn!(
                        event_id = %provider_event_id,
                        event_type = %event_type,
                        "Redelivery of a failed webhook skipped; needs manual reconciliation"
                    );
                } else {
                    info!(event_id = %provider_event_id, status = %status, "Duplicate webhook skipped");
                }
                return Ok(HandlePaymentWebhookResult::Duplicate {
                    provider_event_id,
                    status,
                });
            }
        }

        // 4. Reconcile and settle the ledger entry
        match self.dispatch(&envelope).await {
            Ok(effect) => {
                self.ledger
                    .mark_completed(&provider_event_id, Timestamp::now())
                    .await?;
                info!(event_id = %provider_event_id, effect = ?effect, "Webhook processed");
                Ok(HandlePaymentWebhookResult::Processed {
                    provider_event_id,
                    event_type,
                    effect,
                })
            }
            Err(err) => {
                error!(
                    event_id = %provider_event_id,
                    event_type = %event_type,
                    error = %err,
                    retryable = err.is_retryable(),
                    "Webhook processing failed"
                );
                if let Err(mark_err) = self
                    .ledger
                    .mark_failed(&provider_event_id, Timestamp::now(), &err.to_string())
                    .await
                {
                    error!(event_id = %provider_event_id, error = %mark_err, "Could not mark webhook failed");
                }
                Err(err)
            }
        }
    }

    async fn dispatch(&self, envelope: &WebhookEnvelope) -> Result<ReconcileEffect, WebhookError> {
        match envelope.decode()? {
            BillingEvent::Subscription {
                change: SubscriptionChange::Created,
                payload,
            } => self.subscription_created(&payload).await,
            BillingEvent::Subscription { change, payload } => {
                self.subscription_changed(change, &payload).await
            }
            BillingEvent::Order(order) => self.order(&order).await,
            BillingEvent::PaymentCreated => {
                debug!("payment.created acknowledged; orders carry one-time payments");
                Ok(ReconcileEffect::Acknowledged)
            }
            BillingEvent::Unknown(event_type) => {
                info!(event_type = %event_type, "Unhandled webhook type");
                Ok(ReconcileEffect::Ignored { event_type })
            }
        }
    }

    async fn subscription_created(
        &self,
        payload: &SubscriptionPayload,
    ) -> Result<ReconcileEffect, WebhookError> {
        let user_id = payload
            .metadata_user_id()
            .ok_or_else(|| WebhookError::OwnerNotFound("<no metadata.userId>".to_string()))?;
        let user_id =
            UserId::new(user_id).map_err(|_| WebhookError::OwnerNotFound(user_id.to_string()))?;

        let owner = self
            .owners
            .find_by_user_id(&user_id)
            .await?
            .ok_or_else(|| WebhookError::OwnerNotFound(user_id.to_string()))?;

        let existing = self.subscriptions.find_by_external_id(&payload.id).await?;
        let record = reconcile_subscription_created(
            existing.as_ref(),
            owner.user_id,
            payload,
            Timestamp::now(),
        );
        self.subscriptions.upsert(&record).await?;

        info!(
            subscription_id = %record.external_subscription_id,
            owner_id = %record.owner_id,
            status = %record.status,
            "Subscription created"
        );
        Ok(ReconcileEffect::SubscriptionUpserted {
            external_subscription_id: record.external_subscription_id,
        })
    }

    async fn subscription_changed(
        &self,
        change: SubscriptionChange,
        payload: &SubscriptionPayload,
    ) -> Result<ReconcileEffect, WebhookError> {
        let Some(current) = self.subscriptions.find_by_external_id(&payload.id).await? else {
            warn!(
                subscription_id = %payload.id,
                change = ?change,
                "Lifecycle event for unknown subscription ignored"
            );
            return Ok(ReconcileEffect::SubscriptionMissing {
                external_subscription_id: payload.id.clone(),
            });
        };

        let record = reconcile_subscription_change(&current, change, payload, Timestamp::now());
        self.subscriptions.upsert(&record).await?;

        info!(
            subscription_id = %record.external_subscription_id,
            change = ?change,
            status = %record.status,
            cancel_at_period_end = record.cancel_at_period_end,
            "Subscription updated"
        );
        Ok(ReconcileEffect::SubscriptionUpserted {
            external_subscription_id: record.external_subscription_id,
        })
    }

    async fn order(&self, order: &OrderPayload) -> Result<ReconcileEffect, WebhookError> {
        let external_payment_id = order.id.clone();

        if !order.is_paid() {
            debug!(order_id = %order.id, status = ?order.status, "Order not paid yet");
            return Ok(ReconcileEffect::OrderNotPaid { external_payment_id });
        }

        let Some(user_id) = order.metadata_user_id() else {
            warn!(order_id = %order.id, "Paid order has no metadata.userId; cannot attribute");
            return Ok(ReconcileEffect::UnattributedPayment { external_payment_id });
        };

        let owner = match UserId::new(user_id) {
            Ok(id) => self.owners.find_by_user_id(&id).await?,
            Err(_) => None,
        };
        let Some(owner) = owner else {
            warn!(order_id = %order.id, user_id = %user_id, "Paid order names an unknown user");
            return Ok(ReconcileEffect::PaymentOwnerUnknown {
                external_payment_id,
                user_id: user_id.to_string(),
            });
        };

        let product_type = self.catalog.classify(order).ok_or_else(|| {
            WebhookError::UnknownProduct(
                order
                    .product_id
                    .clone()
                    .unwrap_or_else(|| "<no product_id>".to_string()),
            )
        })?;

        let existing = self.payments.find_by_external_id(&order.id).await?;
        let record = reconcile_order(
            existing.as_ref(),
            owner.user_id,
            product_type,
            order,
            Timestamp::now(),
        );
        self.payments.upsert(&record).await?;

        info!(
            order_id = %record.external_payment_id,
            owner_id = %record.owner_id,
            product_type = %record.product_type,
            replay = existing.is_some(),
            "Payment recorded"
        );
        Ok(ReconcileEffect::PaymentUpserted { external_payment_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryOwnerDirectory, InMemoryPaymentRepository, InMemorySubscriptionRepository,
        InMemoryWebhookEventRepository,
    };
    use crate::domain::billing::ProductType;
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    const SECRET: &str = "test_polar_secret";
    const LIFETIME_PRODUCT: &str = "7a2b5d36-9363-4b56-87e4-c99d9e65816f";

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        handler: HandlePaymentWebhookHandler,
        ledger: InMemoryWebhookEventRepository,
        subscriptions: InMemorySubscriptionRepository,
        payments: InMemoryPaymentRepository,
    }

    async fn fixture() -> Fixture {
        let ledger = InMemoryWebhookEventRepository::new();
        let subscriptions = InMemorySubscriptionRepository::new();
        let payments = InMemoryPaymentRepository::new();
        let owners = InMemoryOwnerDirectory::new().with_users(["u1", "u2"]).await;

        let handler = HandlePaymentWebhookHandler::new(
            PolarWebhookVerifier::new(SECRET).unwrap(),
            Arc::new(ledger.clone()),
            Arc::new(subscriptions.clone()),
            Arc::new(payments.clone()),
            Arc::new(owners),
            ProductCatalog::new(),
        );

        Fixture {
            handler,
            ledger,
            subscriptions,
            payments,
        }
    }

    fn signed(webhook_id: &str, body: &Value) -> HandlePaymentWebhookCommand {
        let payload = serde_json::to_vec(body).unwrap();
        let ts = chrono::Utc::now().timestamp();
        let sig = PolarWebhookVerifier::new(SECRET)
            .unwrap()
            .sign(webhook_id, ts, &payload)
            .unwrap();
        HandlePaymentWebhookCommand {
            webhook_id: Some(webhook_id.to_string()),
            webhook_timestamp: Some(ts.to_string()),
            webhook_signature: Some(sig),
            payload,
        }
    }

    fn paid_order(order_id: &str, user: Option<&str>) -> Value {
        let metadata = match user {
            Some(u) => json!({"userId": u}),
            None => json!({}),
        };
        json!({
            "type": "order.created",
            "data": {
                "id": order_id,
                "paid": true,
                "status": "paid",
                "product_id": LIFETIME_PRODUCT,
                "total_amount": 4900,
                "currency": "usd",
                "created_at": "2025-01-01T12:00:00Z",
                "metadata": metadata
            }
        })
    }

    fn subscription_event(kind: &str, user: &str, extra: Value) -> Value {
        let mut data = json!({
            "id": "sub_1",
            "status": "active",
            "amount": 999,
            "currency": "usd",
            "recurring_interval": "month",
            "current_period_start": "2025-01-01T00:00:00Z",
            "current_period_end": "2099-01-01T00:00:00Z",
            "cancel_at_period_end": false,
            "metadata": {"userId": user}
        });
        if let (Some(d), Some(e)) = (data.as_object_mut(), extra.as_object()) {
            for (k, v) in e {
                d.insert(k.clone(), v.clone());
            }
        }
        json!({"type": kind, "data": data})
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authentication
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_persists_nothing() {
        let f = fixture().await;
        let mut cmd = signed("evt_1", &paid_order("ord_1", Some("u1")));
        cmd.webhook_signature = None;

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(err.is_authentication_failure());
        assert!(f.ledger.is_empty().await);
        assert!(f.payments.is_empty().await);
    }

    #[tokio::test]
    async fn missing_webhook_id_is_rejected_before_body_ids_are_consulted() {
        let f = fixture().await;
        let mut body = paid_order("ord_1", Some("u1"));
        body["id"] = json!("body_evt_1");
        let mut cmd = signed("evt_1", &body);
        cmd.webhook_id = None;

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingHeader("webhook-id")));
        assert!(f.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn signed_webhook_id_is_the_dedup_key() {
        let f = fixture().await;
        let mut body = paid_order("ord_1", Some("u1"));
        body["id"] = json!("body_evt_1");

        f.handler.handle(signed("evt_1", &body)).await.unwrap();

        assert!(f.ledger.find("evt_1").await.unwrap().is_some());
        assert!(f.ledger.find("body_evt_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_signature_persists_nothing() {
        let f = fixture().await;
        let mut cmd = signed("evt_1", &paid_order("ord_1", Some("u1")));
        cmd.webhook_signature = Some("v1,AAAA".to_string());

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
        assert!(f.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn signed_non_json_is_parse_error() {
        let f = fixture().await;
        let ts = chrono::Utc::now().timestamp();
        let body = b"not json".to_vec();
        let sig = PolarWebhookVerifier::new(SECRET).unwrap().sign("evt_1", ts, &body).unwrap();
        let cmd = HandlePaymentWebhookCommand {
            webhook_id: Some("evt_1".into()),
            webhook_timestamp: Some(ts.to_string()),
            webhook_signature: Some(sig),
            payload: body,
        };

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
        assert!(f.ledger.is_empty().await);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_delivery_applies_once() {
        let f = fixture().await;
        let body = paid_order("ord_1", Some("u1"));

        let first = f.handler.handle(signed("evt_1", &body)).await.unwrap();
        assert!(matches!(first, HandlePaymentWebhookResult::Processed { .. }));

        let second = f.handler.handle(signed("evt_1", &body)).await.unwrap();
        assert_eq!(
            second,
            HandlePaymentWebhookResult::Duplicate {
                provider_event_id: "evt_1".to_string(),
                status: ProcessingStatus::Completed,
            }
        );
        assert_eq!(f.payments.len().await, 1);
        assert_eq!(f.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn same_order_under_new_event_id_does_not_duplicate_payment() {
        let f = fixture().await;
        let body = paid_order("ord_1", Some("u1"));

        f.handler.handle(signed("evt_1", &body)).await.unwrap();
        f.handler.handle(signed("evt_2", &body)).await.unwrap();

        assert_eq!(f.payments.len().await, 1);
        assert_eq!(f.ledger.len().await, 2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_created_for_known_owner() {
        let f = fixture().await;
        let result = f
            .handler
            .handle(signed("evt_s1", &subscription_event("subscription.created", "u2", json!({}))))
            .await
            .unwrap();

        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed {
                effect: ReconcileEffect::SubscriptionUpserted { .. },
                ..
            }
        ));
        let sub = f.subscriptions.find_by_external_id("sub_1").await.unwrap().unwrap();
        assert_eq!(sub.owner_id.as_str(), "u2");
    }

    #[tokio::test]
    async fn subscription_created_for_unknown_owner_fails_ledger() {
        let f = fixture().await;
        let err = f
            .handler
            .handle(signed("evt_s1", &subscription_event("subscription.created", "ghost", json!({}))))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::OwnerNotFound(ref u) if u == "ghost"));
        let entry = f.ledger.find("evt_s1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Failed);
        assert!(entry.error_message.unwrap().contains("ghost"));
        assert!(f.subscriptions.is_empty().await);
    }

    #[tokio::test]
    async fn redelivered_failed_event_is_not_reprocessed() {
        let f = fixture().await;
        let body = subscription_event("subscription.created", "ghost", json!({}));
        f.handler.handle(signed("evt_s1", &body)).await.unwrap_err();

        let again = f.handler.handle(signed("evt_s1", &body)).await.unwrap();
        assert_eq!(
            again,
            HandlePaymentWebhookResult::Duplicate {
                provider_event_id: "evt_s1".to_string(),
                status: ProcessingStatus::Failed,
            }
        );
    }

    #[tokio::test]
    async fn update_for_unknown_subscription_completes_without_effect() {
        let f = fixture().await;
        let result = f
            .handler
            .handle(signed("evt_u1", &subscription_event("subscription.updated", "u2", json!({}))))
            .await
            .unwrap();

        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed {
                effect: ReconcileEffect::SubscriptionMissing { .. },
                ..
            }
        ));
        let entry = f.ledger.find("evt_u1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn revoke_after_create_forces_status() {
        let f = fixture().await;
        f.handler
            .handle(signed("evt_s1", &subscription_event("subscription.created", "u2", json!({}))))
            .await
            .unwrap();
        f.handler
            .handle(signed(
                "evt_s2",
                &subscription_event("subscription.revoked", "u2", json!({"status": "canceled"})),
            ))
            .await
            .unwrap();

        let sub = f.subscriptions.find_by_external_id("sub_1").await.unwrap().unwrap();
        assert_eq!(sub.status, "revoked");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Orders
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_order_records_lifetime_payment() {
        let f = fixture().await;
        f.handler.handle(signed("evt_1", &paid_order("ord_1", Some("u1")))).await.unwrap();

        let p = f.payments.find_by_external_id("ord_1").await.unwrap().unwrap();
        assert_eq!(p.product_type, ProductType::Lifetime);
        assert_eq!(p.owner_id.as_str(), "u1");
        assert_eq!(p.amount, 4900);
    }

    #[tokio::test]
    async fn unpaid_order_is_skipped() {
        let f = fixture().await;
        let body = json!({
            "type": "order.created",
            "data": {"id": "ord_1", "paid": false, "status": "pending", "metadata": {"userId": "u1"}}
        });
        let result = f.handler.handle(signed("evt_1", &body)).await.unwrap();

        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed { effect: ReconcileEffect::OrderNotPaid { .. }, .. }
        ));
        assert!(f.payments.is_empty().await);
    }

    #[tokio::test]
    async fn unattributed_order_completes_without_payment() {
        let f = fixture().await;
        let result = f.handler.handle(signed("evt_1", &paid_order("ord_1", None))).await.unwrap();

        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed {
                effect: ReconcileEffect::UnattributedPayment { .. },
                ..
            }
        ));
        assert!(f.payments.is_empty().await);
        let entry = f.ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn order_for_unknown_user_is_skipped() {
        let f = fixture().await;
        let result = f.handler.handle(signed("evt_1", &paid_order("ord_1", Some("ghost")))).await.unwrap();
        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed {
                effect: ReconcileEffect::PaymentOwnerUnknown { .. },
                ..
            }
        ));
        assert!(f.payments.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_product_fails_ledger() {
        let f = fixture().await;
        let body = json!({
            "type": "order.created",
            "data": {"id": "ord_1", "paid": true, "product_id": "prod_x", "metadata": {"userId": "u1"}}
        });
        let err = f.handler.handle(signed("evt_1", &body)).await.unwrap_err();

        assert!(matches!(err, WebhookError::UnknownProduct(ref p) if p == "prod_x"));
        let entry = f.ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn malformed_data_fails_ledger() {
        let f = fixture().await;
        let body = json!({"type": "order.created", "data": {"paid": true}});
        let err = f.handler.handle(signed("evt_1", &body)).await.unwrap_err();

        assert!(matches!(err, WebhookError::MalformedEvent { .. }));
        let entry = f.ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Failed);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Other kinds
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_type_completes() {
        let f = fixture().await;
        let body = json!({"type": "benefit.granted", "data": {"id": "b_1"}});
        let result = f.handler.handle(signed("evt_1", &body)).await.unwrap();

        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed { effect: ReconcileEffect::Ignored { .. }, .. }
        ));
        let entry = f.ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn payment_created_is_acknowledged() {
        let f = fixture().await;
        let body = json!({"type": "payment.created", "data": {"id": "pay_1"}});
        let result = f.handler.handle(signed("evt_1", &body)).await.unwrap();
        assert!(matches!(
            result,
            HandlePaymentWebhookResult::Processed { effect: ReconcileEffect::Acknowledged, .. }
        ));
        assert!(f.payments.is_empty().await);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Storage failures
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingPayments;

    #[async_trait]
    impl PaymentRepository for FailingPayments {
        async fn find_by_external_id(
            &self,
            _id: &str,
        ) -> Result<Option<crate::domain::billing::Payment>, DomainError> {
            Ok(None)
        }

        async fn upsert(&self, _p: &crate::domain::billing::Payment) -> Result<(), DomainError> {
            Err(DomainError::database("disk full"))
        }

        async fn list_by_owner(
            &self,
            _owner: &UserId,
        ) -> Result<Vec<crate::domain::billing::Payment>, DomainError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn storage_failure_marks_failed_and_is_retryable() {
        let ledger = InMemoryWebhookEventRepository::new();
        let handler = HandlePaymentWebhookHandler::new(
            PolarWebhookVerifier::new(SECRET).unwrap(),
            Arc::new(ledger.clone()),
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(FailingPayments),
            Arc::new(InMemoryOwnerDirectory::new().with_users(["u1"]).await),
            ProductCatalog::new(),
        );

        let err = handler.handle(signed("evt_1", &paid_order("ord_1", Some("u1")))).await.unwrap_err();
        assert!(err.is_retryable());
        let entry = ledger.find("evt_1").await.unwrap().unwrap();
        assert_eq!(entry.processing_status, ProcessingStatus::Failed);
        assert!(entry.error_message.unwrap().contains("disk full"));
    }
}
