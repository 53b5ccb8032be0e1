//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/webhooks/polar` - Ingest Polar webhooks
//! - `GET /api/billing/access` - Caller's access status
//! - `GET /api/billing/status` - Access status with the granting record
//! - `GET /api/billing/webhooks/failed` - Failed deliveries for operators
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingAppState};
pub use routes::billing_router;
