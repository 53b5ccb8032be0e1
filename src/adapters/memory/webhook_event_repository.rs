//! In-memory webhook event ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{LedgerEntry, ProcessingStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, ValidationError};
use crate::ports::{AdmitResult, WebhookEventRepository};

/// Ledger backed by a map behind one async lock.
///
/// `admit` checks and inserts under a single write guard, so concurrent
/// deliveries of one event id admit exactly once.
#[derive(Clone, Default)]
pub struct InMemoryWebhookEventRepository {
    entries: Arc<RwLock<HashMap<String, LedgerEntry>>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn transition(
        &self,
        provider_event_id: &str,
        apply: impl FnOnce(&mut LedgerEntry) -> Result<(), ValidationError>,
    ) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(provider_event_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::WebhookEventNotFound,
                format!("No ledger entry for {}", provider_event_id),
            )
        })?;
        apply(entry).map_err(|e| {
            DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                .with_detail("provider_event_id", provider_event_id)
        })
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn admit(&self, entry: LedgerEntry) -> Result<AdmitResult, DomainError> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&entry.provider_event_id) {
            return Ok(AdmitResult::AlreadySeen(existing.processing_status));
        }
        entries.insert(entry.provider_event_id.clone(), entry);
        Ok(AdmitResult::Admitted)
    }

    async fn mark_completed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition(provider_event_id, |e| e.complete(processed_at)).await
    }

    async fn mark_failed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
        error_message: &str,
    ) -> Result<(), DomainError> {
        self.transition(provider_event_id, |e| e.fail(processed_at, error_message))
            .await
    }

    async fn find(&self, provider_event_id: &str) -> Result<Option<LedgerEntry>, DomainError> {
        Ok(self.entries.read().await.get(provider_event_id).cloned())
    }

    async fn list_failed(&self, limit: u32) -> Result<Vec<LedgerEntry>, DomainError> {
        let entries = self.entries.read().await;
        let mut failed: Vec<LedgerEntry> = entries
            .values()
            .filter(|e| e.processing_status == ProcessingStatus::Failed)
            .cloned()
            .collect();
        failed.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        failed.truncate(limit as usize);
        Ok(failed)
    }

}
