//! PostgreSQL implementation of WebhookEventRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{LedgerEntry, ProcessingStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{AdmitResult, WebhookEventRepository};

/// Ledger stored in `webhook_events`.
///
/// Admission relies on the primary key: `ON CONFLICT DO NOTHING RETURNING`
/// returns a row only for the delivery that inserted it.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        provider_event_id: &str,
        target: ProcessingStatus,
        processed_at: Timestamp,
        error_message: Option<&str>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status = $2, processed_at = $3, error_message = $4
            WHERE provider_event_id = $1 AND processing_status = 'processing'
            "#,
        )
        .bind(provider_event_id)
        .bind(target.as_str())
        .bind(processed_at.as_datetime())
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update webhook event: {}", e)))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find(provider_event_id).await? {
            None => Err(DomainError::new(
                ErrorCode::WebhookEventNotFound,
                format!("No ledger entry for {}", provider_event_id),
            )),
            Some(entry) => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition from {} to {}",
                    entry.processing_status, target
                ),
            )
            .with_detail("provider_event_id", provider_event_id)),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    provider_event_id: String,
    event_type: String,
    raw_payload: serde_json::Value,
    received_at: DateTime<Utc>,
    processing_status: String,
    processed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<WebhookEventRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let processing_status = row
            .processing_status
            .parse::<ProcessingStatus>()
            .map_err(|e| DomainError::database(format!("Invalid processing_status: {}", e)))?;

        Ok(LedgerEntry {
            provider_event_id: row.provider_event_id,
            event_type: row.event_type,
            raw_payload: row.raw_payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processing_status,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            error_message: row.error_message,
        })
    }
}

const SELECT_COLUMNS: &str = "provider_event_id, event_type, raw_payload, received_at, \
     processing_status, processed_at, error_message";

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn admit(&self, entry: LedgerEntry) -> Result<AdmitResult, DomainError> {
        let inserted: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO webhook_events (
                provider_event_id, event_type, raw_payload, received_at, processing_status
            ) VALUES ($1, $2, $3, $4, 'processing')
            ON CONFLICT (provider_event_id) DO NOTHING
            RETURNING provider_event_id
            "#,
        )
        .bind(&entry.provider_event_id)
        .bind(&entry.event_type)
        .bind(&entry.raw_payload)
        .bind(entry.received_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to admit webhook event: {}", e)))?;

        if inserted.is_some() {
            return Ok(AdmitResult::Admitted);
        }

        let status: String = sqlx::query_scalar(
            "SELECT processing_status FROM webhook_events WHERE provider_event_id = $1",
        )
        .bind(&entry.provider_event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to read webhook event: {}", e)))?;

        let status = status
            .parse::<ProcessingStatus>()
            .map_err(|e| DomainError::database(format!("Invalid processing_status: {}", e)))?;

        Ok(AdmitResult::AlreadySeen(status))
    }

    async fn mark_completed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition(provider_event_id, ProcessingStatus::Completed, processed_at, None)
            .await
    }

    async fn mark_failed(
        &self,
        provider_event_id: &str,
        processed_at: Timestamp,
        error_message: &str,
    ) -> Result<(), DomainError> {
        self.transition(
            provider_event_id,
            ProcessingStatus::Failed,
            processed_at,
            Some(error_message),
        )
        .await
    }

    async fn find(&self, provider_event_id: &str) -> Result<Option<LedgerEntry>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE provider_event_id = $1",
            SELECT_COLUMNS
        ))
        .bind(provider_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find webhook event: {}", e)))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn list_failed(&self, limit: u32) -> Result<Vec<LedgerEntry>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE processing_status = 'failed' \
             ORDER BY received_at DESC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list failed webhooks: {}", e)))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
