//! WebhookEventRepository port - the received-event ledger.
//!
//! The provider delivers at least once, so the same event id can arrive
//! many times, concurrently or days apart. `admit` is the single point that
//! decides which delivery gets to apply its effect: it must be one atomic
//! insert-if-absent, never a read followed by a write.
//!
//! The ledger is append-only. An entry is never removed, so an event id
//! that was seen once stays seen.

use async_trait::async_trait;

use crate::domain::billing::{LedgerEntry, ProcessingStatus};
use crate::domain::foundation::{DomainError, Timestamp};

/// Outcome of admitting an event to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitResult {
    /// First delivery; the caller now owns processing.
    Admitted,
    /// An entry already exists, in the given state.
    AlreadySeen(ProcessingStatus),
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Inserts the entry in `Processing` state unless its
    /// `provider_event_id` is already present.
    async fn admit(&self, entry: LedgerEntry) -> Result<AdmitResult, DomainError>;

    /// Moves a `Processing` entry to `Completed`.
    ///
    /// Fails with `InvalidStateTransition` if the entry is not processing and
    /// `WebhookEventNotFound` if it does not exist.
    async fn mark_completed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Moves a `Processing` entry to `Failed` with the error message.
    async fn mark_failed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
        error_message: &str,
    ) -> Result<(), DomainError>;

    async fn find(&self, provider_event_id: &str) -> Result<Option<LedgerEntry>, DomainError>;

    /// Most recent failed entries first.
    async fn list_failed(&self, limit: u32) -> Result<Vec<LedgerEntry>, DomainError>;
}
