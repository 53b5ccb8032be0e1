//! Payment configuration
//!
//! Everything the webhook pipeline and the access resolver need from the
//! environment: the Polar signing secret, the fixed-term length, the
//! signature tolerance and extra storefront products.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{
    EntitlementPolicy, PolarWebhookVerifier, ProductCatalog, ProductType, DEFAULT_FIXED_TERM_DAYS,
    DEFAULT_TOLERANCE_SECS,
};

/// Payment configuration (Polar)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Polar webhook signing secret, `whsec_`-prefixed or raw
    pub webhook_secret: SecretString,

    /// Length of a fixed-term purchase in days
    #[serde(default = "default_fixed_term_days")]
    pub fixed_term_days: i64,

    /// Accepted clock skew for webhook timestamps, in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,

    /// Extra lifetime product ids (comma-separated)
    pub lifetime_product_ids: Option<String>,

    /// Extra fixed-term product ids (comma-separated)
    pub fixed_term_product_ids: Option<String>,
}

impl PaymentConfig {
    /// Builds the signature verifier from the secret and tolerance.
    pub fn verifier(&self) -> Result<PolarWebhookVerifier, ValidationError> {
        PolarWebhookVerifier::new(self.webhook_secret.expose_secret())
            .map(|v| v.with_tolerance_secs(self.signature_tolerance_secs))
            .map_err(|e| ValidationError::InvalidWebhookSecret(e.to_string()))
    }

    /// Built-in products plus the configured extras.
    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new()
            .with_products(ProductType::Lifetime, split_ids(&self.lifetime_product_ids))
            .with_products(ProductType::FixedTerm, split_ids(&self.fixed_term_product_ids))
    }

    pub fn entitlement_policy(&self) -> EntitlementPolicy {
        EntitlementPolicy::with_fixed_term_days(self.fixed_term_days)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_secret.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__WEBHOOK_SECRET"));
        }
        self.verifier()?;

        ValidationError::ensure_range("fixed_term_days", self.fixed_term_days, 1, 3650)?;
        ValidationError::ensure_range("signature_tolerance_secs", self.signature_tolerance_secs, 1, 3600)?;
        Ok(())
    }
}

fn split_ids(ids: &Option<String>) -> Vec<String> {
    ids.as_deref()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn default_fixed_term_days() -> i64 {
    DEFAULT_FIXED_TERM_DAYS
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}
