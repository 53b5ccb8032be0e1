//! Standard Webhooks signature verification for Polar deliveries.
//!
//! The provider signs `"{webhook-id}.{webhook-timestamp}.{body}"` with
//! HMAC-SHA256 and sends one or more base64 signatures in the
//! `webhook-signature` header as space-separated `v1,<sig>` entries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::billing_event::WebhookEnvelope;
use super::webhook_errors::WebhookError;

/// Default tolerance in both directions (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// The three signing headers, all required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl WebhookHeaders {
    /// Builds the header set, failing on the first absent or blank header.
    pub fn new(
        id: Option<&str>,
        timestamp: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Self, WebhookError> {
        fn required(value: Option<&str>, name: &'static str) -> Result<String, WebhookError> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(WebhookError::MissingHeader(name))
        }

        Ok(Self {
            id: required(id, HEADER_ID)?,
            timestamp: required(timestamp, HEADER_TIMESTAMP)?,
            signature: required(signature, HEADER_SIGNATURE)?,
        })
    }
}

/// A delivery that passed verification and parsed as an envelope.
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    pub webhook_id: String,
    pub envelope: WebhookEnvelope,
    pub raw: Value,
}

/// Verifier for Polar webhook signatures.
#[derive(Clone)]
pub struct PolarWebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for PolarWebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolarWebhookVerifier")
            .field("key", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl PolarWebhookVerifier {
    /// Creates a verifier from the configured secret.
    ///
    /// A `whsec_`-prefixed secret is base64-decoded after the prefix; any
    /// other secret is used as raw bytes.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let key = match secret.strip_prefix(SECRET_PREFIX) {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?,
            None => secret.as_bytes().to_vec(),
        };
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret("secret is empty".to_string()));
        }
        Ok(Self {
            key,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        })
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies the signature against the current clock and parses the body.
    pub fn verify_and_parse(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<VerifiedWebhook, WebhookError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())?;
        let (envelope, raw) = WebhookEnvelope::parse(body)?;
        Ok(VerifiedWebhook {
            webhook_id: headers.id.clone(),
            envelope,
            raw,
        })
    }

    /// Verifies the signature as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;

        if now.abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfRange);
        }

        let expected = self.compute_signature(&headers.id, timestamp, body)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|candidate| constant_time_compare(&expected, &candidate));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Produces a `v1,<base64>` header value for the given delivery.
    pub fn sign(&self, webhook_id: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let sig = self.compute_signature(webhook_id, timestamp, body)?;
        Ok(format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(sig)))
    }

    fn compute_signature(
        &self,
        webhook_id: &str,
        timestamp: i64,
        body: &[u8],
    ) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;
        mac.update(webhook_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Constant-time comparison; lengths are not secret.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
