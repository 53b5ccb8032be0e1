//! GetAccessStatusHandler - Query handler for a user's premium access.

use std::sync::Arc;

use crate::domain::billing::{resolve, AccessDecision, BillingError, EntitlementPolicy};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{PaymentRepository, SubscriptionRepository};

/// Query for the current access of one user.
#[derive(Debug, Clone)]
pub struct GetAccessStatusQuery {
    pub user_id: UserId,
    /// Evaluation instant; `None` means now.
    pub at: Option<Timestamp>,
}

impl GetAccessStatusQuery {
    pub fn now(user_id: UserId) -> Self {
        Self { user_id, at: None }
    }
}

/// Handler for access queries.
///
/// Reads the owner's records and hands them to the pure resolver, so the
/// answer is always derived from what is stored rather than cached.
pub struct GetAccessStatusHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRepository>,
    policy: EntitlementPolicy,
}

impl GetAccessStatusHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRepository>,
        policy: EntitlementPolicy,
    ) -> Self {
        Self {
            subscriptions,
            payments,
            policy,
        }
    }

    pub async fn handle(&self, query: GetAccessStatusQuery) -> Result<AccessDecision, BillingError> {
        let subscriptions = self.subscriptions.list_by_owner(&query.user_id).await?;
        let payments = self.payments.list_by_owner(&query.user_id).await?;
        let now = query.at.unwrap_or_else(Timestamp::now);

        Ok(resolve(&subscriptions, &payments, now, &self.policy))
    }
}
