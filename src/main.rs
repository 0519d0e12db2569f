//! Paybridge server binary.
//!
//! Loads configuration, connects to the billing database and serves the
//! gateway endpoints.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use paybridge::adapters::http::gateway::{gateway_router, GatewayAppState};
use paybridge::adapters::postgres::{PostgresInvoiceLedger, PostgresSessionStore};
use paybridge::adapters::stripe::StripeProcessorClient;
use paybridge::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    if !config.gateway.has_webhook_secret() {
        tracing::warn!("no webhook signing secret configured; webhook deliveries will be rejected");
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let state = GatewayAppState {
        ledger: Arc::new(PostgresInvoiceLedger::new(pool.clone())),
        sessions: Arc::new(PostgresSessionStore::new(pool.clone())),
        processor: Arc::new(StripeProcessorClient::from_config(&config.gateway)),
        config: config.gateway.clone(),
    };

    let app = gateway_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        mode = config.gateway.mode.as_str(),
        "gateway listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
