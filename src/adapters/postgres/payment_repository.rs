//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Payment, ProductType};
use crate::domain::foundation::{DomainError, PaymentId, Timestamp, UserId};
use crate::ports::PaymentRepository;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    external_payment_id: String,
    owner_id: String,
    product_type: String,
    price_id: Option<String>,
    amount: i64,
    currency: Option<String>,
    status: String,
    paid_at: DateTime<Utc>,
    customer_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let product_type = row
            .product_type
            .parse::<ProductType>()
            .map_err(|e| DomainError::database(format!("Invalid product_type: {}", e)))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            external_payment_id: row.external_payment_id,
            owner_id: UserId::new(row.owner_id)
                .map_err(|e| DomainError::database(format!("Invalid owner_id: {}", e)))?,
            product_type,
            price_id: row.price_id,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
            paid_at: Timestamp::from_datetime(row.paid_at),
            customer_id: row.customer_id,
            metadata: row.metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const SELECT_COLUMNS: &str = "id, external_payment_id, owner_id, product_type, price_id, amount, \
     currency, status, paid_at, customer_id, metadata, created_at, updated_at";

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn find_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE external_payment_id = $1",
            SELECT_COLUMNS
        ))
        .bind(external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn upsert(&self, p: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, external_payment_id, owner_id, product_type, price_id, amount, currency,
                status, paid_at, customer_id, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (external_payment_id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                product_type = EXCLUDED.product_type,
                price_id = EXCLUDED.price_id,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                paid_at = EXCLUDED.paid_at,
                customer_id = EXCLUDED.customer_id,
                metadata = EXCLUDED.metadata,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(p.id.as_uuid())
        .bind(&p.external_payment_id)
        .bind(p.owner_id.as_str())
        .bind(p.product_type.as_str())
        .bind(&p.price_id)
        .bind(p.amount)
        .bind(&p.currency)
        .bind(&p.status)
        .bind(p.paid_at.as_datetime())
        .bind(&p.customer_id)
        .bind(&p.metadata)
        .bind(p.created_at.as_datetime())
        .bind(p.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert payment: {}", e)))?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE owner_id = $1 ORDER BY paid_at",
            SELECT_COLUMNS
        ))
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payments: {}", e)))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
