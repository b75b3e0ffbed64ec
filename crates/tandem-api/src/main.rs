mod auth;
mod companies;
mod config;
mod customers;
mod error;
mod routes;

use std::sync::Arc;

use tandem_core::db::{LibSqlSessionRepository, SessionRepository};

use config::AppConfig;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tandem_api=info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting tandem-api with config: {:?}", config);

    let state = AppState::initialize(config).await?;

    // Stale sessions accumulate between restarts; sweep them once at boot.
    let swept = LibSqlSessionRepository::new(state.db.connection())
        .delete_expired(chrono::Utc::now().timestamp_millis())
        .await?;
    if swept > 0 {
        tracing::info!(swept, "Removed expired sessions");
    }

    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("tandem-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
