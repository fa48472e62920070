//! RAG Server binary
//!
//! Run with: cargo run -p doc-rag --bin doc-rag-server [config.toml]

use doc_rag::{config::RagConfig, generation::OllamaClient, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration: file from argv or DOC_RAG_CONFIG, then env overrides
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DOC_RAG_CONFIG").ok());
    let mut config = match &config_path {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;

    tracing::info!(
        "Configuration loaded{}",
        config_path
            .as_deref()
            .map(|p| format!(" from {}", p))
            .unwrap_or_default()
    );
    tracing::info!("  - Storage: {}", config.vector_db.storage_path.display());
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let client = OllamaClient::new(&config.llm)?;
    match client.list_models().await {
        Ok(models) => {
            tracing::info!("Ollama is running ({} models available)", models.len());
            for wanted in [&config.llm.embed_model, &config.llm.generate_model] {
                let present = models
                    .iter()
                    .any(|m| m == wanted || m.split(':').next() == Some(wanted.as_str()));
                if !present {
                    tracing::warn!("Model {} not found; run: ollama pull {}", wanted, wanted);
                }
            }
        }
        Err(e) => {
            tracing::warn!("Ollama not available at {}: {}", config.llm.base_url, e);
            tracing::warn!("Start it with `ollama serve`; requests will fail until it is reachable");
        }
    }

    let server = RagServer::new(config)?;
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
