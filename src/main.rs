//! Storefront order service

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::api::{self, AppState};
use storefront::auth::JwtService;
use storefront::bus::EventBus;
use storefront::config::Config;
use storefront::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (json, plain) = if config.is_production() {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry().with(filter).with(json).with(plain).init();
    tracing::debug!(?config, "Configuration loaded");

    let store = PgStore::connect(&config.database_url, config.db_max_connections).await.context("connecting to database")?;
    store.migrate().await.context("running migrations")?;

    let events = EventBus::connect(config.nats_url.as_deref()).await;
    let jwt = JwtService::new(&config.jwt_secret)?;
    let app = api::router(AppState::new(store, jwt, events));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
