//! SubscriptionRepository port.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, UserId};

/// Stores reconciled subscriptions, unique by external subscription id.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Inserts or replaces the record with the same external id.
    async fn upsert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Subscription>, DomainError>;
}
