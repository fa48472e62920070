//! Ollama-based providers for embeddings and generation
//!
//! Both wrap a shared [`OllamaClient`] to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::generation::OllamaClient;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String> {
        self.client.generate(model, prompt, temperature).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Embedding and generation providers sharing one Ollama client
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create both providers over a single connection pool
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(config)?);
        Ok(Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), config.embed_model.clone()),
            llm: OllamaLlm::from_client(client),
        })
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_uses_configured_model() {
        let config = LlmConfig {
            embed_model: "mxbai-embed-large".to_string(),
            ..LlmConfig::default()
        };
        let (embedder, llm) = OllamaProvider::new(&config).unwrap().split();
        assert_eq!(embedder.model(), "mxbai-embed-large");
        assert_eq!(embedder.name(), "ollama");
        assert_eq!(llm.name(), "ollama");
    }
}
