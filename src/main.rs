use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use movie_rec_api::{
    api::{create_router, AppState},
    config::Config,
    services::{EmbeddingTable, OnnxPredictor},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    // Both resources are required; any failure here stops startup
    let table = EmbeddingTable::load_from_file(&config.embeddings_path)
        .with_context(|| format!("Error loading {}", config.embeddings_path))?;
    let predictor = OnnxPredictor::load(&config.model_path)
        .with_context(|| format!("Error loading {}", config.model_path))?;

    let state = AppState::new(table, Arc::new(predictor), config.sampling_seed);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
