use anyhow::Context;
use tracing_subscriber::{prelude::*, EnvFilter};

use book_recommender::{
    api::{create_router, AppState},
    artifacts::Artifacts,
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // No degraded start: both artifacts and the record store must be available
    let artifacts = Artifacts::load(&config.matrix_path, &config.model_path).map_err(|e| {
        tracing::error!(error = %e, "Model loading failed");
        e
    })?;
    let store = db::connect(&config)
        .await
        .context("Failed to connect the record store")?;

    let state = AppState::new(artifacts, store, &config);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
