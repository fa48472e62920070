//! Result types returned by the pipelines

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Text shown in place of results when a collection has nothing to return
pub const NO_RESULTS_MESSAGE: &str = "No results found.";

/// A chunk returned by nearest-neighbor search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Entry ID
    pub id: Uuid,
    /// Chunk text
    pub content: String,
    /// Distance to the query vector (lower is nearer)
    pub distance: f32,
    /// Metadata stored with the entry
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Outcome of a nearest-neighbor query.
///
/// An empty or never-written collection is `NoResults`, never an empty
/// `Found` list and never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "results", rename_all = "snake_case")]
pub enum Retrieval {
    /// Matches ordered nearest first
    Found(Vec<RetrievedChunk>),
    /// The collection holds no entries
    NoResults,
}

impl Retrieval {
    /// Wrap ranked matches, mapping an empty list to `NoResults`
    pub fn from_ranked(chunks: Vec<RetrievedChunk>) -> Self {
        if chunks.is_empty() {
            Self::NoResults
        } else {
            Self::Found(chunks)
        }
    }

    /// Whether this is the no-results sentinel
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoResults)
    }

    /// Number of retrieved chunks
    pub fn len(&self) -> usize {
        match self {
            Self::Found(chunks) => chunks.len(),
            Self::NoResults => 0,
        }
    }

    /// Retrieved chunks, nearest first
    pub fn chunks(&self) -> &[RetrievedChunk] {
        match self {
            Self::Found(chunks) => chunks,
            Self::NoResults => &[],
        }
    }

    /// Ranked texts for display; the sentinel renders as [`NO_RESULTS_MESSAGE`]
    pub fn texts(&self) -> Vec<String> {
        match self {
            Self::Found(chunks) => chunks.iter().map(|c| c.content.clone()).collect(),
            Self::NoResults => vec![NO_RESULTS_MESSAGE.to_string()],
        }
    }
}

/// Why a file contributed no text to a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Extension is not pdf, docx or txt
    UnsupportedFormat(String),
    /// Loader failed on a recognized format
    ExtractionFailed(String),
    /// Batch was cancelled before the file was read
    Cancelled,
}

/// A file that was skipped, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Original file name
    pub filename: String,
    /// Reason for skipping
    pub reason: SkipReason,
}

/// A chunk whose embedding could not be produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedChunk {
    /// Sequence number of the chunk in its batch
    pub chunk_id: u32,
    /// Last error seen
    pub error: String,
}

/// Final report of one ingestion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStatus {
    /// Target collection
    pub collection: String,
    /// Identifier of this ingestion call, stored in chunk metadata
    pub batch_id: Uuid,
    /// Files handed to the call
    pub files_received: usize,
    /// Files whose text was extracted
    pub files_processed: usize,
    /// Files that contributed no text
    pub files_skipped: Vec<SkippedFile>,
    /// Chunks cut from the batch document
    pub chunks_total: usize,
    /// Chunks embedded and inserted
    pub chunks_stored: usize,
    /// Chunks dropped after exhausting embedding retries
    pub failed_chunks: Vec<FailedChunk>,
    /// IDs of the inserted entries
    pub stored_ids: Vec<Uuid>,
    /// Whether the batch stopped early on request
    pub cancelled: bool,
}

impl IngestStatus {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Stored {} of {} chunks in collection '{}' ({} files processed, {} skipped{})",
            self.chunks_stored,
            self.chunks_total,
            self.collection,
            self.files_processed,
            self.files_skipped.len(),
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

/// A generated answer with its grounding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Verbatim model output
    pub answer: String,
    /// Context string injected into the prompt
    pub context: String,
    /// Chunks the context was built from, nearest first
    pub sources: Vec<RetrievedChunk>,
    /// False when retrieval returned the no-results sentinel
    pub context_found: bool,
    /// Model that produced the answer
    pub model: String,
}

/// Collection name with its entry count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Number of stored entries
    pub entries: usize,
}
