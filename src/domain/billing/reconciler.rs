//! Pure state reconcilers.
//!
//! Each function takes the currently stored record (if any) and an event
//! payload and returns the record to upsert. Applying the same payload
//! twice yields the same record, apart from `updated_at`.

use serde_json::Value;

use super::billing_event::{OrderPayload, SubscriptionChange, SubscriptionPayload};
use super::payment::{Payment, ProductType, DEFAULT_PAYMENT_STATUS};
use super::subscription::{Subscription, REVOKED_STATUS};
use crate::domain::foundation::{PaymentId, SubscriptionId, Timestamp, UserId};

/// Builds the record for `subscription.created`.
///
/// A replayed creation overwrites the provider-owned fields but keeps the
/// stored identity and creation time.
pub fn reconcile_subscription_created(
    existing: Option<&Subscription>,
    owner_id: UserId,
    payload: &SubscriptionPayload,
    now: Timestamp,
) -> Subscription {
    Subscription {
        id: existing.map(|s| s.id).unwrap_or_else(SubscriptionId::new),
        external_subscription_id: payload.id.clone(),
        owner_id,
        price_id: payload.price_id.clone(),
        amount: payload.amount,
        currency: payload.currency.clone(),
        interval: payload.recurring_interval.clone(),
        status: payload.status.clone().unwrap_or_default(),
        current_period_start: payload.current_period_start,
        current_period_end: payload.current_period_end,
        cancel_at_period_end: payload.cancel_at_period_end.unwrap_or(false),
        started_at: payload.started_at,
        ended_at: payload.ended_at,
        canceled_at: payload.canceled_at,
        cancellation_reason: non_blank(&payload.customer_cancellation_reason),
        cancellation_comment: non_blank(&payload.customer_cancellation_comment),
        customer_id: payload.customer_id.clone(),
        metadata: metadata_or_empty(&payload.metadata),
        created_at: existing.map(|s| s.created_at).unwrap_or(now),
        updated_at: now,
    }
}

/// Applies a lifecycle change to an existing subscription.
///
/// `Created` is handled by [`reconcile_subscription_created`]; passed here it
/// behaves like `Updated`.
pub fn reconcile_subscription_change(
    current: &Subscription,
    change: SubscriptionChange,
    payload: &SubscriptionPayload,
    now: Timestamp,
) -> Subscription {
    let mut next = current.clone();
    let status = payload.status.clone().unwrap_or_else(|| current.status.clone());

    match change {
        SubscriptionChange::Created | SubscriptionChange::Updated => {
            next.amount = payload.amount.or(current.amount);
            next.status = status;
            next.current_period_start = payload.current_period_start.or(current.current_period_start);
            next.current_period_end = payload.current_period_end.or(current.current_period_end);
            next.cancel_at_period_end = payload
                .cancel_at_period_end
                .unwrap_or(current.cancel_at_period_end);
            if !payload.metadata.is_null() {
                next.metadata = payload.metadata.clone();
            }
        }
        SubscriptionChange::Active => {
            next.status = status;
            next.started_at = payload.started_at.or(current.started_at);
        }
        SubscriptionChange::Canceled => {
            next.status = status;
            next.canceled_at = payload.canceled_at.or(current.canceled_at);
            next.cancel_at_period_end = payload
                .cancel_at_period_end
                .unwrap_or(current.cancel_at_period_end);
            next.cancellation_reason = non_blank(&payload.customer_cancellation_reason);
            next.cancellation_comment = non_blank(&payload.customer_cancellation_comment);
        }
        SubscriptionChange::Uncanceled => {
            next.status = status;
            next.cancel_at_period_end = false;
            next.canceled_at = None;
            next.cancellation_reason = None;
            next.cancellation_comment = None;
        }
        SubscriptionChange::Revoked => {
            next.status = REVOKED_STATUS.to_string();
            next.ended_at = payload.ended_at.or(current.ended_at);
        }
    }

    next.updated_at = now;
    next
}

/// Builds the payment record for a paid order.
///
/// On replay the stored amount, status and paid time are kept wherever the
/// new payload is silent.
pub fn reconcile_order(
    existing: Option<&Payment>,
    owner_id: UserId,
    product_type: ProductType,
    order: &OrderPayload,
    now: Timestamp,
) -> Payment {
    let status = order
        .status
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| existing.map(|p| p.status.clone()))
        .unwrap_or_else(|| DEFAULT_PAYMENT_STATUS.to_string());

    Payment {
        id: existing.map(|p| p.id).unwrap_or_else(PaymentId::new),
        external_payment_id: order.id.clone(),
        owner_id,
        product_type,
        price_id: order.product_price_id.clone(),
        amount: order
            .reported_amount()
            .or_else(|| existing.map(|p| p.amount))
            .unwrap_or(0),
        currency: order.currency.clone(),
        status,
        paid_at: order
            .created_at
            .or_else(|| existing.map(|p| p.paid_at))
            .unwrap_or(now),
        customer_id: order.customer_id.clone(),
        metadata: metadata_or_empty(&order.metadata),
        created_at: existing.map(|p| p.created_at).unwrap_or(now),
        updated_at: now,
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.trim().is_empty())
}

fn metadata_or_empty(metadata: &Value) -> Value {
    if metadata.is_null() {
        Value::Object(Default::default())
    } else {
        metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn created_payload() -> SubscriptionPayload {
        SubscriptionPayload {
            id: "sub_1".to_string(),
            price_id: Some("price_1".to_string()),
            amount: Some(999),
            currency: Some("usd".to_string()),
            recurring_interval: Some("month".to_string()),
            status: Some("active".to_string()),
            current_period_start: Some(ts("2025-01-01T00:00:00Z")),
            current_period_end: Some(ts("2025-02-01T00:00:00Z")),
            cancel_at_period_end: Some(false),
            started_at: Some(ts("2025-01-01T00:00:00Z")),
            customer_id: Some("cus_1".to_string()),
            metadata: json!({"userId": "u2"}),
            ..Default::default()
        }
    }

    fn stored() -> Subscription {
        reconcile_subscription_created(None, owner("u2"), &created_payload(), ts("2025-01-01T00:00:01Z"))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // subscription.created
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn created_copies_provider_fields() {
        let sub = stored();
        assert_eq!(sub.external_subscription_id, "sub_1");
        assert_eq!(sub.owner_id.as_str(), "u2");
        assert_eq!(sub.status, "active");
        assert_eq!(sub.interval.as_deref(), Some("month"));
        assert_eq!(sub.current_period_end, Some(ts("2025-02-01T00:00:00Z")));
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn replayed_creation_keeps_identity() {
        let first = stored();
        let later = ts("2025-01-05T00:00:00Z");
        let again = reconcile_subscription_created(Some(&first), owner("u2"), &created_payload(), later);

        assert_eq!(again.id, first.id);
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.updated_at, later);
        assert_eq!(again.status, first.status);
    }

    #[test]
    fn created_without_metadata_stores_empty_object() {
        let payload = SubscriptionPayload { metadata: Value::Null, ..created_payload() };
        let sub = reconcile_subscription_created(None, owner("u2"), &payload, Timestamp::now());
        assert_eq!(sub.metadata, json!({}));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // lifecycle changes
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn updated_patches_period_and_flag() {
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            current_period_end: Some(ts("2025-03-01T00:00:00Z")),
            cancel_at_period_end: Some(true),
            ..Default::default()
        };
        let next = reconcile_subscription_change(&stored(), SubscriptionChange::Updated, &payload, Timestamp::now());

        assert_eq!(next.current_period_end, Some(ts("2025-03-01T00:00:00Z")));
        assert!(next.cancel_at_period_end);
        assert_eq!(next.amount, Some(999));
        assert_eq!(next.metadata, json!({"userId": "u2"}));
    }

    #[test]
    fn active_sets_started_at() {
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            started_at: Some(ts("2025-01-02T00:00:00Z")),
            ..Default::default()
        };
        let next = reconcile_subscription_change(&stored(), SubscriptionChange::Active, &payload, Timestamp::now());
        assert_eq!(next.started_at, Some(ts("2025-01-02T00:00:00Z")));
    }

    #[test]
    fn canceled_records_reason() {
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            cancel_at_period_end: Some(true),
            canceled_at: Some(ts("2025-01-10T00:00:00Z")),
            customer_cancellation_reason: Some("too_expensive".to_string()),
            customer_cancellation_comment: Some("".to_string()),
            ..Default::default()
        };
        let next = reconcile_subscription_change(&stored(), SubscriptionChange::Canceled, &payload, Timestamp::now());

        assert!(next.cancel_at_period_end);
        assert_eq!(next.canceled_at, Some(ts("2025-01-10T00:00:00Z")));
        assert_eq!(next.cancellation_reason.as_deref(), Some("too_expensive"));
        assert_eq!(next.cancellation_comment, None);
    }

    #[test]
    fn uncanceled_clears_cancellation() {
        let canceled = {
            let mut s = stored();
            s.cancel_at_period_end = true;
            s.canceled_at = Some(ts("2025-01-10T00:00:00Z"));
            s.cancellation_reason = Some("other".to_string());
            s
        };
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            ..Default::default()
        };
        let next = reconcile_subscription_change(&canceled, SubscriptionChange::Uncanceled, &payload, Timestamp::now());

        assert!(!next.cancel_at_period_end);
        assert_eq!(next.canceled_at, None);
        assert_eq!(next.cancellation_reason, None);
    }

    #[test]
    fn revoked_forces_status() {
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("canceled".to_string()),
            ended_at: Some(ts("2025-01-15T00:00:00Z")),
            ..Default::default()
        };
        let next = reconcile_subscription_change(&stored(), SubscriptionChange::Revoked, &payload, Timestamp::now());
        assert_eq!(next.status, "revoked");
        assert_eq!(next.ended_at, Some(ts("2025-01-15T00:00:00Z")));
    }

    #[test]
    fn change_without_status_keeps_current() {
        let payload = SubscriptionPayload { id: "sub_1".to_string(), ..Default::default() };
        let next = reconcile_subscription_change(&stored(), SubscriptionChange::Active, &payload, Timestamp::now());
        assert_eq!(next.status, "active");
    }

    #[test]
    fn change_is_idempotent() {
        let payload = SubscriptionPayload {
            id: "sub_1".to_string(),
            status: Some("active".to_string()),
            cancel_at_period_end: Some(true),
            ..Default::default()
        };
        let now = Timestamp::now();
        let once = reconcile_subscription_change(&stored(), SubscriptionChange::Updated, &payload, now);
        let twice = reconcile_subscription_change(&once, SubscriptionChange::Updated, &payload, now);
        assert_eq!(once, twice);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // orders
    // ════════════════════════════════════════════════════════════════════════════

    fn paid_order() -> OrderPayload {
        OrderPayload {
            id: "ord_1".to_string(),
            paid: Some(true),
            status: Some("paid".to_string()),
            product_id: Some("7a2b5d36-9363-4b56-87e4-c99d9e65816f".to_string()),
            product_price_id: Some("price_life".to_string()),
            currency: Some("usd".to_string()),
            total_amount: Some(4900),
            net_amount: Some(4500),
            created_at: Some(ts("2025-01-01T12:00:00Z")),
            metadata: json!({"userId": "u1"}),
            ..Default::default()
        }
    }

    #[test]
    fn new_order_becomes_payment() {
        let p = reconcile_order(None, owner("u1"), ProductType::Lifetime, &paid_order(), Timestamp::now());
        assert_eq!(p.external_payment_id, "ord_1");
        assert_eq!(p.amount, 4900);
        assert_eq!(p.status, "paid");
        assert_eq!(p.paid_at, ts("2025-01-01T12:00:00Z"));
        assert_eq!(p.product_type, ProductType::Lifetime);
    }

    #[test]
    fn new_order_defaults() {
        let order = OrderPayload { id: "ord_2".to_string(), paid: Some(true), ..Default::default() };
        let now = Timestamp::now();
        let p = reconcile_order(None, owner("u1"), ProductType::FixedTerm, &order, now);
        assert_eq!(p.amount, 0);
        assert_eq!(p.status, "paid");
        assert_eq!(p.paid_at, now);
        assert_eq!(p.metadata, json!({}));
    }

    #[test]
    fn replayed_order_falls_back_to_existing() {
        let first = reconcile_order(None, owner("u1"), ProductType::Lifetime, &paid_order(), Timestamp::now());
        let sparse = OrderPayload { id: "ord_1".to_string(), paid: Some(true), ..Default::default() };
        let again = reconcile_order(Some(&first), owner("u1"), ProductType::Lifetime, &sparse, Timestamp::now());

        assert_eq!(again.id, first.id);
        assert_eq!(again.amount, 4900);
        assert_eq!(again.status, "paid");
        assert_eq!(again.paid_at, first.paid_at);
        assert_eq!(again.created_at, first.created_at);
    }

    #[test]
    fn net_amount_used_when_total_absent() {
        let order = OrderPayload { total_amount: None, ..paid_order() };
        let p = reconcile_order(None, owner("u1"), ProductType::Lifetime, &order, Timestamp::now());
        assert_eq!(p.amount, 4500);
    }
}
