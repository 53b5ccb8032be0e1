//! Recurring subscription record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

/// Provider statuses that can grant access.
pub const ENTITLING_STATUSES: [&str; 2] = ["active", "trialing"];

/// Status forced on revocation regardless of payload.
pub const REVOKED_STATUS: &str = "revoked";

/// A provider subscription as last reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub external_subscription_id: String,
    pub owner_id: UserId,
    pub price_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub interval: Option<String>,
    pub status: String,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub cancellation_comment: Option<String>,
    pub customer_id: Option<String>,
    pub metadata: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn has_entitling_status(&self) -> bool {
        ENTITLING_STATUSES.contains(&self.status.as_str())
    }

    /// Whether this subscription grants access at `now`.
    ///
    /// An absent period end is treated as open-ended. A subscription set to
    /// cancel at period end stops granting once that end has passed.
    pub fn grants_access_at(&self, now: &Timestamp) -> bool {
        if !self.has_entitling_status() {
            return false;
        }
        let within_period = match &self.current_period_end {
            None => true,
            Some(end) => end.is_after(now),
        };
        let lapsed_cancellation = self.cancel_at_period_end
            && self
                .current_period_end
                .map(|end| end.is_before(now))
                .unwrap_or(false);

        within_period && !lapsed_cancellation
    }
}
