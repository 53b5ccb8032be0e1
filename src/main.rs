//! Service entry point: configuration, logging, storage and the HTTP server.

use std::sync::Arc;

use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quiz_entitlements::adapters::http::{billing_router, BillingAppState};
use quiz_entitlements::adapters::postgres::{
    PostgresOwnerDirectory, PostgresPaymentRepository, PostgresSubscriptionRepository,
    PostgresWebhookEventRepository,
};
use quiz_entitlements::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::load_validated()?;
    init_tracing(&config.server);

    info!(
        environment = ?config.server.environment,
        fixed_term_days = config.payment.fixed_term_days,
        "Starting quiz-entitlements"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    info!("PostgreSQL connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let state = BillingAppState {
        ledger: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        owners: Arc::new(PostgresOwnerDirectory::new(pool.clone())),
        verifier: config.payment.verifier()?,
        catalog: config.payment.catalog(),
        policy: config.payment.entitlement_policy(),
    };

    let app = billing_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.server.request_timeout())),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close(pool).await;
    Ok(())
}

/// JSON lines in production, human-readable output elsewhere.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));

    if server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn close(pool: PgPool) {
    pool.close().await;
    info!("Database pool closed");
}
