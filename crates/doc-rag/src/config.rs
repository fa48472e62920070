//! Configuration for the RAG system
//!
//! One `RagConfig` is built per process (or per test) and handed to the
//! pipeline constructors; nothing reads settings from globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::processing::RetryPolicy;
use crate::types::query::ContextPolicy;

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama embedding/generation configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
    /// Ingestion concurrency and timeouts
    pub processing: ProcessingConfig,
    /// Query defaults
    pub query: QueryConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file. Missing sections keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: RagConfig = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Override selected settings from the environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("DOC_RAG_STORAGE_PATH") {
            self.vector_db.storage_path = PathBuf::from(path);
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.llm.base_url = if host.starts_with("http") {
                host
            } else {
                format!("http://{}", host)
            };
        }
        if let Ok(model) = std::env::var("DOC_RAG_EMBED_MODEL") {
            self.llm.embed_model = model;
        }
        if let Ok(model) = std::env::var("DOC_RAG_GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Ok(port) = std::env::var("DOC_RAG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("DOC_RAG_PORT '{}': {}", port, e)))?;
        }
        Ok(())
    }

    /// Check that the settings are mutually consistent
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.llm.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "temperature {} is outside [0, 2]",
                self.llm.temperature
            )));
        }
        if self.query.n_results == 0 {
            return Err(Error::Config("n_results must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name, shared by ingestion and query
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Default sampling temperature for generation
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per external call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl LlmConfig {
    /// Retry policy for calls to the embedding/generation service
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory holding the persistent collections
    pub storage_path: PathBuf,
    /// Timeout for a single index read or write in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./VectorStore"),
            timeout_secs: 30,
        }
    }
}

/// Ingestion concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Timeout for extracting a single file in seconds (default: 300 = 5 minutes)
    pub file_timeout_secs: u64,
    /// Number of files extracted concurrently (default: CPU count, max 8)
    pub parallel_files: Option<usize>,
    /// Number of concurrent embedding calls per batch (default: CPU count, max 4)
    pub parallel_embeddings: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            file_timeout_secs: 300, // 5 minutes
            parallel_files: None,   // Auto-detect from CPU count
            parallel_embeddings: None,
        }
    }
}

impl ProcessingConfig {
    /// Resolved file worker count
    pub fn file_workers(&self) -> usize {
        self.parallel_files
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }

    /// Resolved embedding worker count
    pub fn embedding_workers(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }

    /// Per-file extraction timeout
    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}

/// Query defaults, each overridable per request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Number of chunks retrieved per question
    pub n_results: usize,
    /// How retrieved chunks become grounding context
    pub context_policy: ContextPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            n_results: 5,
            context_policy: ContextPolicy::AllRanked,
        }
    }
}
