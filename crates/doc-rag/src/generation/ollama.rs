//! Ollama HTTP client for embeddings and text generation
//!
//! Each method issues a single request. Retries and per-call timeouts are
//! applied by the pipelines through [`crate::processing::RetryPolicy`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Server base URL without trailing slash
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Names of the models available on the server
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Model listing failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::llm(format!("Model listing failed: HTTP {}", response.status())));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse model list: {}", e)))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Embed `text` with `model`
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest { model, prompt: text };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if embed_response.embedding.is_empty() {
            return Err(Error::embedding(format!("Model '{}' returned an empty embedding", model)));
        }
        Ok(embed_response.embedding)
    }

    /// Generate a completion for `prompt`
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        tracing::debug!("Generating with model {} at temperature {}", model, temperature);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

        Ok(generate_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_carries_temperature() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Question: why?",
            stream: false,
            options: GenerateOptions { temperature: 0.7 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = LlmConfig {
            base_url: "http://ollama:11434/".to_string(),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://ollama:11434");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(!client.health_check().await.unwrap());

        let err = client.embed("nomic-embed-text", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.is_retryable());
    }
}
