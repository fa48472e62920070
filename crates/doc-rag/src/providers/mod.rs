//! Provider abstractions for embeddings, generation and vector storage
//!
//! The pipelines depend only on these traits; Ollama and the local SQLite
//! index are the shipped implementations.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::LocalVectorIndex;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use vector_index::VectorIndex;
