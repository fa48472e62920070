//! doc-rag: retrieval-augmented generation over named document collections
//!
//! Files (PDF, DOCX, plain text) are extracted, split into overlapping
//! chunks, embedded through Ollama and stored in persistent named
//! collections. Questions are embedded the same way, matched against a
//! collection by cosine distance, and answered by a generation model that is
//! told to use only the retrieved context.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{IngestionPipeline, QueryPipeline, RagPipeline};
pub use processing::{CancellationToken, RetryPolicy};
pub use types::{
    Answer, ContextPolicy, IngestStatus, ModelParams, Retrieval, RetrievedChunk, SourceFile,
};
