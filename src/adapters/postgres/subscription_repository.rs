//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    external_subscription_id: String,
    owner_id: String,
    price_id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
    interval: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    cancellation_comment: Option<String>,
    customer_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let ts = |dt: Option<DateTime<Utc>>| dt.map(Timestamp::from_datetime);

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            external_subscription_id: row.external_subscription_id,
            owner_id: UserId::new(row.owner_id)
                .map_err(|e| DomainError::database(format!("Invalid owner_id: {}", e)))?,
            price_id: row.price_id,
            amount: row.amount,
            currency: row.currency,
            interval: row.interval,
            status: row.status,
            current_period_start: ts(row.current_period_start),
            current_period_end: ts(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            started_at: ts(row.started_at),
            ended_at: ts(row.ended_at),
            canceled_at: ts(row.canceled_at),
            cancellation_reason: row.cancellation_reason,
            cancellation_comment: row.cancellation_comment,
            customer_id: row.customer_id,
            metadata: row.metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_COLUMNS: &str = "id, external_subscription_id, owner_id, price_id, amount, currency, \
     interval, status, current_period_start, current_period_end, cancel_at_period_end, \
     started_at, ended_at, canceled_at, cancellation_reason, cancellation_comment, customer_id, \
     metadata, created_at, updated_at";

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE external_subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(&self, s: &Subscription) -> Result<(), DomainError> {
        let as_dt = |t: &Option<Timestamp>| t.map(|t| *t.as_datetime());

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, external_subscription_id, owner_id, price_id, amount, currency, interval,
                status, current_period_start, current_period_end, cancel_at_period_end,
                started_at, ended_at, canceled_at, cancellation_reason, cancellation_comment,
                customer_id, metadata, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            ON CONFLICT (external_subscription_id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                price_id = EXCLUDED.price_id,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                interval = EXCLUDED.interval,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                started_at = EXCLUDED.started_at,
                ended_at = EXCLUDED.ended_at,
                canceled_at = EXCLUDED.canceled_at,
                cancellation_reason = EXCLUDED.cancellation_reason,
                cancellation_comment = EXCLUDED.cancellation_comment,
                customer_id = EXCLUDED.customer_id,
                metadata = EXCLUDED.metadata,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(s.id.as_uuid())
        .bind(&s.external_subscription_id)
        .bind(s.owner_id.as_str())
        .bind(&s.price_id)
        .bind(s.amount)
        .bind(&s.currency)
        .bind(&s.interval)
        .bind(&s.status)
        .bind(as_dt(&s.current_period_start))
        .bind(as_dt(&s.current_period_end))
        .bind(s.cancel_at_period_end)
        .bind(as_dt(&s.started_at))
        .bind(as_dt(&s.ended_at))
        .bind(as_dt(&s.canceled_at))
        .bind(&s.cancellation_reason)
        .bind(&s.cancellation_comment)
        .bind(&s.customer_id)
        .bind(&s.metadata)
        .bind(s.created_at.as_datetime())
        .bind(s.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert subscription: {}", e)))?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE owner_id = $1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list subscriptions: {}", e)))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
