//! Ledger Anomaly Scoring Server - entry point

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scoring_core::LoadedModel;
use scoring_server::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging; `log` records from scoring-core are bridged in
    let (plain, json) = if config.log_json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "scoring_server=debug,scoring_core=info,tower_http=debug".into()))
        .with(plain)
        .with(json)
        .init();

    tracing::info!("Scoring server v{} starting ({})", env!("CARGO_PKG_VERSION"), config.environment);

    let loaded = LoadedModel::load(&config.model_path, config.model_sha256.as_deref())
        .with_context(|| format!("Failed to load model bundle from {}", config.model_path))?;

    if config.is_production() && config.model_sha256.is_none() {
        tracing::warn!("MODEL_SHA256 not set; bundle integrity is not verified");
    }

    let state = AppState::new(config.clone(), loaded).context("Failed to build scoring context")?;
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
