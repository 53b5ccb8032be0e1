//! Adapters - Implementations of port interfaces.
//!
//! - `http` - axum endpoints
//! - `memory` - in-process repositories for tests and local runs
//! - `postgres` - sqlx repositories

pub mod http;
pub mod memory;
pub mod postgres;
