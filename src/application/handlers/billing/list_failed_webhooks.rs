//! ListFailedWebhooksHandler - Query handler for the reconciliation backlog.

use std::sync::Arc;

use crate::domain::billing::{BillingError, LedgerEntry};
use crate::ports::WebhookEventRepository;

pub const DEFAULT_FAILED_LIMIT: u32 = 50;
pub const MAX_FAILED_LIMIT: u32 = 200;

/// Query for failed ledger entries, newest first.
#[derive(Debug, Clone)]
pub struct ListFailedWebhooksQuery {
    pub limit: Option<u32>,
}

pub struct ListFailedWebhooksHandler {
    ledger: Arc<dyn WebhookEventRepository>,
}

impl ListFailedWebhooksHandler {
    pub fn new(ledger: Arc<dyn WebhookEventRepository>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: ListFailedWebhooksQuery,
    ) -> Result<Vec<LedgerEntry>, BillingError> {
        let limit = query.limit.unwrap_or(DEFAULT_FAILED_LIMIT);
        if limit == 0 || limit > MAX_FAILED_LIMIT {
            return Err(BillingError::validation(
                "limit",
                format!("must be between 1 and {}", MAX_FAILED_LIMIT),
            ));
        }

        Ok(self.ledger.list_failed(limit).await?)
    }
}
