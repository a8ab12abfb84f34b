//! Document Q&A server binary
//!
//! Run with: cargo run --bin docqa-server

use docqa::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::from_env()?;

    tracing::info!("configuration loaded");
    tracing::info!(
        "  - embedding model: {} ({} dims)",
        config.embedding.model,
        config.embedding.dimensions
    );
    tracing::info!("  - generation model: {}", config.llm.model);
    tracing::info!("  - storage dir: {}", config.index.storage_dir.display());
    tracing::info!(
        "  - chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    // Warn early when the model endpoint is down; requests will fail with a
    // clear error until it comes up.
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/tags", config.llm.base_url))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            tracing::info!("model endpoint reachable at {}", config.llm.base_url);
        }
        _ => {
            tracing::warn!("model endpoint not reachable at {}", config.llm.base_url);
            tracing::warn!("start Ollama and pull the configured models:");
            tracing::warn!("  ollama pull {}", config.embedding.model);
            tracing::warn!("  ollama pull {}", config.llm.model);
        }
    }

    let server = RagServer::new(config)?;

    tracing::info!("endpoints:");
    tracing::info!("  POST /api/upload      - upload documents");
    tracing::info!("  POST /api/chat        - ask a question");
    tracing::info!("  POST /api/chat/stream - ask with a streamed answer");
    tracing::info!("  GET  /api/documents   - list documents");
    tracing::info!("  GET  /api/health      - service health");

    server.start().await?;

    Ok(())
}
