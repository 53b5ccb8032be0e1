//! In-memory payment store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::PaymentRepository;

/// Payments keyed by external payment id.
#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<String, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(external_payment_id).cloned())
    }

    async fn upsert(&self, payment: &Payment) -> Result<(), DomainError> {
        self.payments
            .write()
            .await
            .insert(payment.external_payment_id.clone(), payment.clone());
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| &p.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
