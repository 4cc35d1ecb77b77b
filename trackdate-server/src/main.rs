//! trackdate-server - release-year quiz service
//!
//! HTTP service that samples a streaming-service playlist, resolves each
//! song's original release year against a discography catalog, and streams
//! the results to the client while a quiz is underway.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trackdate_server::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting trackdate-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env().context("configuration")?);
    info!("Catalog API: {}", config.catalog_api_url);
    info!("Worker callback: {}", config.worker_url());

    let state = AppState::from_config(Arc::clone(&config)).context("state initialization")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
