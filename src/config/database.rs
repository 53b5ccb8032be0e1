//! Database configuration
//!
//! The ledger, subscriptions and payments all live in one PostgreSQL
//! database shared with the platform's `users` table.

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// PostgreSQL connection and pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,

    pub min_connections: u32,
    pub max_connections: u32,

    /// Seconds to wait for a free connection before a request fails
    pub acquire_timeout_secs: u64,

    /// Seconds a connection may sit idle; `0` keeps idle connections forever
    pub idle_timeout_secs: u64,

    /// Apply the embedded migrations on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: 2,
            max_connections: 10,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 600,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// Pool options with sizes and timeouts applied; the caller connects.
    pub fn pool_options(&self) -> PgPoolOptions {
        let idle = (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs));

        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(idle)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        let scheme_ok = ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));
        if !scheme_ok {
            return Err(ValidationError::InvalidDatabaseUrl);
        }

        ValidationError::ensure_range("max_connections", self.max_connections.into(), 1, 100)?;
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        ValidationError::ensure_range(
            "acquire_timeout_secs",
            i64::try_from(self.acquire_timeout_secs).unwrap_or(i64::MAX),
            1,
            120,
        )?;
        Ok(())
    }
}
