//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresWebhookEventRepository` - ledger with atomic admission
//! - `PostgresSubscriptionRepository` / `PostgresPaymentRepository` - upserted records
//! - `PostgresOwnerDirectory` - read-only lookup in the platform `users` table

mod owner_directory;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use owner_directory::PostgresOwnerDirectory;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;
