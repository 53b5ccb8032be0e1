//! Configuration loaded once at startup.
//!
//! Values come from `QUIZ_ENTITLEMENTS__*` environment variables (nested
//! sections separated by `__`), with a `.env` file read first when present.
//! A config that fails [`AppConfig::validate`] never reaches the server.

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Everything the service reads from its environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the environment into typed sections.
    ///
    /// `QUIZ_ENTITLEMENTS__PAYMENT__WEBHOOK_SECRET=whsec_...` becomes
    /// `payment.webhook_secret`. Nothing is validated here.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("QUIZ_ENTITLEMENTS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step; the service refuses to start otherwise.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
