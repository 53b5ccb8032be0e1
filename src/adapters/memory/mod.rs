//! In-memory adapters.
//!
//! Used by tests and local runs without a database. Each store keeps its
//! data behind one `tokio::sync::RwLock`.

mod owner_directory;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use owner_directory::InMemoryOwnerDirectory;
pub use payment_repository::InMemoryPaymentRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
