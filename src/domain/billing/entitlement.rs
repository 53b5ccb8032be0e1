//! Entitlement resolution.
//!
//! Access is derived on every read from the stored subscriptions and
//! payments of one owner. Nothing here is persisted or cached, so access
//! lapses as soon as a period or term ends without any event arriving.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::payment::{Payment, ProductType};
use super::subscription::Subscription;
use crate::domain::foundation::{PaymentId, SubscriptionId, Timestamp};

/// Default fixed-term length: one year.
pub const DEFAULT_FIXED_TERM_DAYS: i64 = 365;

/// Access tier, highest first in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    None,
    FixedTerm,
    Subscription,
    Lifetime,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::FixedTerm => "fixed-term",
            Tier::Subscription => "subscription",
            Tier::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The access answer other subsystems consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatus {
    pub has_active_access: bool,
    pub tier: Tier,
}

impl AccessStatus {
    pub fn none() -> Self {
        Self {
            has_active_access: false,
            tier: Tier::None,
        }
    }

    pub fn granted(tier: Tier) -> Self {
        Self {
            has_active_access: tier != Tier::None,
            tier,
        }
    }
}

/// The record that granted access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Grant {
    #[serde(rename_all = "camelCase")]
    Payment {
        id: PaymentId,
        external_payment_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Subscription {
        id: SubscriptionId,
        external_subscription_id: String,
    },
}

/// An access status with the grant behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub status: AccessStatus,
    pub grant: Option<Grant>,
    /// When access ends if nothing changes; `None` for lifetime or no access.
    pub expires_at: Option<Timestamp>,
}

impl AccessDecision {
    fn none() -> Self {
        Self {
            status: AccessStatus::none(),
            grant: None,
            expires_at: None,
        }
    }
}

/// Tunables for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementPolicy {
    pub fixed_term: Duration,
}

impl EntitlementPolicy {
    pub fn with_fixed_term_days(days: i64) -> Self {
        Self {
            fixed_term: Duration::days(days),
        }
    }
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self::with_fixed_term_days(DEFAULT_FIXED_TERM_DAYS)
    }
}

/// Resolves access for one owner at `now`.
///
/// First match wins: settled lifetime payment, then an entitling
/// subscription, then an unexpired settled fixed-term payment.
pub fn resolve(
    subscriptions: &[Subscription],
    payments: &[Payment],
    now: Timestamp,
    policy: &EntitlementPolicy,
) -> AccessDecision {
    if let Some(p) = payments
        .iter()
        .find(|p| p.product_type == ProductType::Lifetime && p.is_settled())
    {
        return AccessDecision {
            status: AccessStatus::granted(Tier::Lifetime),
            grant: Some(payment_grant(p)),
            expires_at: None,
        };
    }

    if let Some(s) = subscriptions
        .iter()
        .filter(|s| s.grants_access_at(&now))
        // open-ended periods outlast any dated one
        .max_by_key(|s| (s.current_period_end.is_none(), s.current_period_end))
    {
        return AccessDecision {
            status: AccessStatus::granted(Tier::Subscription),
            grant: Some(Grant::Subscription {
                id: s.id,
                external_subscription_id: s.external_subscription_id.clone(),
            }),
            expires_at: s.current_period_end,
        };
    }

    if let Some(p) = payments
        .iter()
        .filter(|p| p.product_type == ProductType::FixedTerm && p.grants_access_at(&now, policy.fixed_term))
        .max_by_key(|p| p.paid_at)
    {
        return AccessDecision {
            status: AccessStatus::granted(Tier::FixedTerm),
            grant: Some(payment_grant(p)),
            expires_at: p.expires_at(policy.fixed_term),
        };
    }

    AccessDecision::none()
}

fn payment_grant(p: &Payment) -> Grant {
    Grant::Payment {
        id: p.id,
        external_payment_id: p.external_payment_id.clone(),
    }
}
