//! Quiz Entitlements - Polar webhook ingestion and premium access resolution.
//!
//! Verified provider events are recorded once in a ledger, reconciled into
//! subscription and payment records, and read back as a single access
//! decision per user.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
