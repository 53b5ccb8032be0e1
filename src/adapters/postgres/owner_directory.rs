//! PostgreSQL implementation of OwnerDirectory over the platform `users` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{Owner, OwnerDirectory};

pub struct PostgresOwnerDirectory {
    pool: PgPool,
}

impl PostgresOwnerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    token_identifier: String,
    name: Option<String>,
    email: Option<String>,
}

#[async_trait]
impl OwnerDirectory for PostgresOwnerDirectory {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Owner>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT token_identifier, name, email FROM users WHERE token_identifier = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to look up user: {}", e)))?;

        row.map(|r| -> Result<Owner, DomainError> {
            Ok(Owner {
                user_id: UserId::new(r.token_identifier)?,
                email: r.email,
                name: r.name,
            })
        })
        .transpose()
    }
}
