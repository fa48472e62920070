//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType, IndexEntry, SourceFile, SourceSpan};
pub use query::{AnswerRequest, ContextPolicy, ModelParams, QueryRequest};
pub use response::{
    Answer, CollectionInfo, FailedChunk, IngestStatus, Retrieval, RetrievedChunk, SkipReason,
    SkippedFile, NO_RESULTS_MESSAGE,
};
