//! PaymentRepository port.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, UserId};

/// Stores one-time payments, unique by external payment (order) id.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Inserts or replaces the record with the same external id. Replays
    /// never produce a second row.
    async fn upsert(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Payment>, DomainError>;
}
