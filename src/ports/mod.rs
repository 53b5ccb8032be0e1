//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger
//!
//! - `WebhookEventRepository` - received-event ledger and dedup gate
//!
//! ## Records
//!
//! - `SubscriptionRepository` - reconciled subscriptions
//! - `PaymentRepository` - reconciled one-time payments
//!
//! ## Platform
//!
//! - `OwnerDirectory` - lookup of platform users by identity id

mod owner_directory;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use owner_directory::{Owner, OwnerDirectory};
pub use payment_repository::PaymentRepository;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_repository::{AdmitResult, WebhookEventRepository};
