//! LLM provider trait for text generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for prompt completion
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete `prompt` with `model` at the given sampling temperature,
    /// returning the raw output
    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
