//! Polar webhook payloads.
//!
//! The envelope is parsed once, right after signature verification. The
//! `data` object is decoded into a typed payload only when the event is
//! dispatched, so a payload that does not fit its kind fails after the
//! event has been admitted to the ledger.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WebhookError;
use crate::domain::foundation::Timestamp;

/// Outer webhook envelope: `{ "type": ..., "data": { ... } }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,

    /// Present on some provider payloads; used as a dedup fallback.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub data: Value,
}

/// Where the deduplication key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventIdSource {
    /// The signed `webhook-id` header.
    Header,
    /// The envelope's top-level `id`.
    Envelope,
    /// The object id inside `data`; two events about one object collide.
    DataObject,
}

impl WebhookEnvelope {
    /// Parses a verified body. The raw JSON value is returned alongside so
    /// the ledger can store exactly what was received.
    pub fn parse(body: &[u8]) -> Result<(Self, Value), WebhookError> {
        let raw: Value =
            serde_json::from_slice(body).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let envelope: WebhookEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Ok((envelope, raw))
    }

    /// Resolves the provider event id: header, then envelope `id`, then `data.id`.
    pub fn provider_event_id(&self, webhook_id: Option<&str>) -> Option<(String, EventIdSource)> {
        let non_empty = |s: &str| !s.trim().is_empty();

        if let Some(id) = webhook_id.filter(|s| non_empty(s)) {
            return Some((id.to_string(), EventIdSource::Header));
        }
        if let Some(id) = self.id.as_deref().filter(|s| non_empty(s)) {
            return Some((id.to_string(), EventIdSource::Envelope));
        }
        self.data
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| non_empty(s))
            .map(|id| (id.to_string(), EventIdSource::DataObject))
    }

    /// Parses the event type into a known kind.
    pub fn kind(&self) -> EventKind {
        EventKind::from_str(&self.event_type)
    }

    /// Decodes `data` into the typed event for dispatch.
    pub fn decode(&self) -> Result<BillingEvent, WebhookError> {
        let kind = self.kind();
        let event = match kind {
            EventKind::Subscription(change) => BillingEvent::Subscription {
                change,
                payload: self.decode_data()?,
            },
            EventKind::OrderCreated | EventKind::OrderUpdated => {
                BillingEvent::Order(self.decode_data()?)
            }
            EventKind::PaymentCreated => BillingEvent::PaymentCreated,
            EventKind::Unknown => BillingEvent::Unknown(self.event_type.clone()),
        };
        Ok(event)
    }

    fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.clone()).map_err(|e| WebhookError::MalformedEvent {
            event_type: self.event_type.clone(),
            reason: e.to_string(),
        })
    }
}

/// Subscription lifecycle changes the provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Created,
    Updated,
    Active,
    Canceled,
    Uncanceled,
    Revoked,
}

/// Known event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Subscription(SubscriptionChange),
    OrderCreated,
    OrderUpdated,
    PaymentCreated,
    Unknown,
}

impl EventKind {
    /// Parse event kind from the provider's type string.
    pub fn from_str(s: &str) -> Self {
        use SubscriptionChange::*;
        match s {
            "subscription.created" => Self::Subscription(Created),
            "subscription.updated" => Self::Subscription(Updated),
            "subscription.active" => Self::Subscription(Active),
            "subscription.canceled" => Self::Subscription(Canceled),
            "subscription.uncanceled" => Self::Subscription(Uncanceled),
            "subscription.revoked" => Self::Subscription(Revoked),
            "order.created" => Self::OrderCreated,
            "order.updated" => Self::OrderUpdated,
            "payment.created" => Self::PaymentCreated,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use SubscriptionChange::*;
        match self {
            Self::Subscription(Created) => "subscription.created",
            Self::Subscription(Updated) => "subscription.updated",
            Self::Subscription(Active) => "subscription.active",
            Self::Subscription(Canceled) => "subscription.canceled",
            Self::Subscription(Uncanceled) => "subscription.uncanceled",
            Self::Subscription(Revoked) => "subscription.revoked",
            Self::OrderCreated => "order.created",
            Self::OrderUpdated => "order.updated",
            Self::PaymentCreated => "payment.created",
            Self::Unknown => "unknown",
        }
    }
}

/// A decoded event, ready for exhaustive dispatch.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    Subscription {
        change: SubscriptionChange,
        payload: SubscriptionPayload,
    },
    Order(OrderPayload),
    /// Acknowledged without effect; orders carry one-time payments.
    PaymentCreated,
    Unknown(String),
}

/// Polar subscription object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionPayload {
    pub id: String,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub recurring_interval: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_start: Option<Timestamp>,
    #[serde(default)]
    pub current_period_end: Option<Timestamp>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub ended_at: Option<Timestamp>,
    #[serde(default)]
    pub canceled_at: Option<Timestamp>,
    #[serde(default)]
    pub customer_cancellation_reason: Option<String>,
    #[serde(default)]
    pub customer_cancellation_comment: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// Polar order object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderPayload {
    pub id: String,
    #[serde(default)]
    pub paid: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_price_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub net_amount: Option<i64>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub metadata: Value,
}

/// Reads `metadata.userId`, or `metadata.ownerId` when absent, ignoring blanks.
fn metadata_user_id(metadata: &Value) -> Option<&str> {
    ["userId", "ownerId"].iter().find_map(|key| {
        metadata
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    })
}

impl SubscriptionPayload {
    pub fn metadata_user_id(&self) -> Option<&str> {
        metadata_user_id(&self.metadata)
    }
}

impl OrderPayload {
    pub fn metadata_user_id(&self) -> Option<&str> {
        metadata_user_id(&self.metadata)
    }

    /// `metadata.productType` as set by the checkout flow.
    pub fn metadata_product_type(&self) -> Option<&str> {
        self.metadata.get("productType").and_then(Value::as_str)
    }

    /// Orders are reconciled only once paid.
    pub fn is_paid(&self) -> bool {
        self.paid == Some(true) || self.status.as_deref() == Some("paid")
    }

    /// Amount reported by the provider, gross before net.
    pub fn reported_amount(&self) -> Option<i64> {
        self.total_amount.or(self.net_amount)
    }
}
