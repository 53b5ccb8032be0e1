//! One-time payment record and product types.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PaymentId, Timestamp, UserId, ValidationError};

/// Payment statuses accepted as settled. An empty status also counts.
pub const ACCEPTED_PAYMENT_STATUSES: [&str; 3] = ["completed", "paid", "succeeded"];

/// Status given to a newly recorded order that reported none.
pub const DEFAULT_PAYMENT_STATUS: &str = "paid";

/// What a one-time purchase buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    /// Never expires.
    Lifetime,
    /// Expires after the configured term (one year by default).
    FixedTerm,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Lifetime => "lifetime",
            ProductType::FixedTerm => "fixed-term",
        }
    }

    /// Interprets the checkout flow's `metadata.productType` label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "lifetime" => Some(ProductType::Lifetime),
            "1-year" | "fixed-term" => Some(ProductType::FixedTerm),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| {
            ValidationError::invalid_format("product_type", format!("unknown value '{}'", s))
        })
    }
}

/// A one-time purchase, keyed by the provider's order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub external_payment_id: String,
    pub owner_id: UserId,
    pub product_type: ProductType,
    pub price_id: Option<String>,
    pub amount: i64,
    pub currency: Option<String>,
    pub status: String,
    pub paid_at: Timestamp,
    pub customer_id: Option<String>,
    pub metadata: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Whether the provider reported this payment as settled.
    pub fn is_settled(&self) -> bool {
        self.status.is_empty() || ACCEPTED_PAYMENT_STATUSES.contains(&self.status.as_str())
    }

    /// Whether this payment grants access at `now` given the fixed-term length.
    pub fn grants_access_at(&self, now: &Timestamp, fixed_term: Duration) -> bool {
        if !self.is_settled() {
            return false;
        }
        match self.product_type {
            ProductType::Lifetime => true,
            ProductType::FixedTerm => self.paid_at.plus(fixed_term).is_after(now),
        }
    }

    /// End of access for a fixed-term payment; `None` for lifetime.
    pub fn expires_at(&self, fixed_term: Duration) -> Option<Timestamp> {
        match self.product_type {
            ProductType::Lifetime => None,
            ProductType::FixedTerm => Some(self.paid_at.plus(fixed_term)),
        }
    }
}
