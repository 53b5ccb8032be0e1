//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machines)
//! - `billing` - Webhook events, reconciled records and entitlement resolution

pub mod billing;
pub mod foundation;
