//! Batch ingestion: extract, chunk, embed and store

use futures::future::join_all;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{FileParser, TextChunker, TextExtractor};
use crate::processing::{CancellationToken, RetryPolicy};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::{
    Chunk, Document, FailedChunk, FileType, IndexEntry, IngestStatus, SkipReason, SkippedFile,
    SourceFile,
};

/// Stages of one ingestion call, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    ReceiveFiles,
    Extract,
    Chunk,
    EmbedAndStore,
    Done,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReceiveFiles => "receive_files",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::EmbedAndStore => "embed_and_store",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

enum FileOutcome {
    Extracted { filename: String, text: String },
    Skipped(SkippedFile),
}

enum ChunkOutcome {
    Stored(Uuid),
    EmbedFailed(FailedChunk),
    IndexFailed(Error),
    NotDispatched,
}

/// Orchestrates extraction, chunking, embedding and insertion for a batch
/// of files into one collection
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    embed_retry: RetryPolicy,
    index_retry: RetryPolicy,
    file_workers: usize,
    embedding_workers: usize,
    file_timeout: Duration,
}

impl IngestionPipeline {
    /// Create a pipeline from configuration and providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let chunker = TextChunker::from_config(&config.chunking)?;
        let embed_retry = config.llm.retry_policy();
        let index_retry = RetryPolicy::new(
            config.llm.max_attempts,
            Duration::from_millis(config.llm.retry_backoff_ms),
            Duration::from_secs(config.vector_db.timeout_secs),
        );

        let file_workers = config.processing.file_workers();
        let embedding_workers = config.processing.embedding_workers();

        tracing::info!(
            "Ingestion configured: {} parallel files, {} parallel embeddings, {}s file timeout, chunks {}/{}",
            file_workers,
            embedding_workers,
            config.processing.file_timeout_secs,
            chunker.chunk_size(),
            chunker.overlap()
        );

        Ok(Self {
            embedder,
            index,
            extractor: Arc::new(FileParser),
            chunker,
            embed_retry,
            index_retry,
            file_workers,
            embedding_workers,
            file_timeout: config.processing.file_timeout(),
        })
    }

    /// Replace the file extractor (defaults to [`FileParser`])
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Ingest a batch of files into `collection`
    pub async fn ingest(&self, files: Vec<SourceFile>, collection: &str) -> Result<IngestStatus> {
        self.ingest_with_cancel(files, collection, &CancellationToken::new())
            .await
    }

    /// Ingest a batch, stopping early once `cancel` fires.
    ///
    /// Files not yet extracted are skipped and chunks not yet dispatched are
    /// dropped; chunks already stored stay in the collection.
    ///
    /// An index failure stops the batch with [`Error::PartialIngest`], which
    /// names the batch and the entries it left behind.
    pub async fn ingest_with_cancel(
        &self,
        files: Vec<SourceFile>,
        collection: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestStatus> {
        if collection.trim().is_empty() {
            return Err(Error::InvalidInput("collection name must not be empty".to_string()));
        }

        let batch_id = Uuid::new_v4();
        let files_received = files.len();
        log_stage(IngestStage::ReceiveFiles, batch_id, collection);
        tracing::info!("Batch {} received {} files", batch_id, files_received);

        self.index_retry
            .run("get_or_create", || self.index.get_or_create(collection))
            .await?;

        log_stage(IngestStage::Extract, batch_id, collection);
        let outcomes = self.extract_all(files, cancel).await?;

        let mut document = Document::new(batch_id);
        let mut files_skipped = Vec::new();
        let mut files_processed = 0;
        for outcome in outcomes {
            match outcome {
                FileOutcome::Extracted { filename, text } => {
                    document.append(&filename, &text);
                    files_processed += 1;
                }
                FileOutcome::Skipped(skipped) => files_skipped.push(skipped),
            }
        }

        log_stage(IngestStage::Chunk, batch_id, collection);
        let chunks: Vec<Chunk> = self.chunker.chunk_document(&document).collect();
        let chunks_total = chunks.len();
        tracing::info!(
            "Batch {}: {} files extracted, {} skipped, {} chunks",
            batch_id,
            files_processed,
            files_skipped.len(),
            chunks_total
        );

        log_stage(IngestStage::EmbedAndStore, batch_id, collection);
        let outcomes = self.embed_and_store(chunks, collection, cancel).await?;

        let mut stored_ids = Vec::new();
        let mut failed_chunks = Vec::new();
        let mut index_error = None;
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Stored(id) => stored_ids.push(id),
                ChunkOutcome::EmbedFailed(failed) => failed_chunks.push(failed),
                ChunkOutcome::IndexFailed(e) => {
                    index_error.get_or_insert(e);
                }
                ChunkOutcome::NotDispatched => {}
            }
        }

        if let Some(e) = index_error {
            tracing::error!(
                "Batch {} aborted after storing {} chunks in '{}': {}",
                batch_id,
                stored_ids.len(),
                collection,
                e
            );
            return Err(Error::PartialIngest {
                batch_id,
                stored_ids,
                source: Box::new(e),
            });
        }

        let status = IngestStatus {
            collection: collection.to_string(),
            batch_id,
            files_received,
            files_processed,
            files_skipped,
            chunks_total,
            chunks_stored: stored_ids.len(),
            failed_chunks,
            stored_ids,
            cancelled: cancel.is_cancelled(),
        };

        log_stage(IngestStage::Done, batch_id, collection);
        tracing::info!("{}", status.summary());
        Ok(status)
    }

    /// Extract every file concurrently; outcomes keep input order
    async fn extract_all(
        &self,
        files: Vec<SourceFile>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileOutcome>> {
        let semaphore = Semaphore::new(self.file_workers);

        let futures = files.into_iter().map(|file| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::internal(format!("File worker pool closed: {}", e)))?;
                Ok::<_, Error>(self.extract_one(file, cancel).await)
            }
        });

        join_all(futures).await.into_iter().collect()
    }

    async fn extract_one(&self, file: SourceFile, cancel: &CancellationToken) -> FileOutcome {
        let filename = file.name.clone();
        let skip = |reason: SkipReason| {
            FileOutcome::Skipped(SkippedFile {
                filename: filename.clone(),
                reason,
            })
        };

        if cancel.is_cancelled() {
            return skip(SkipReason::Cancelled);
        }

        if file.file_type() == FileType::Unknown {
            let extension = filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .unwrap_or_default();
            tracing::warn!("Skipping {}: unsupported file type '{}'", filename, extension);
            return skip(SkipReason::UnsupportedFormat(extension));
        }

        tracing::debug!("Extracting {} ({} bytes)", filename, file.data.len());
        let extractor = self.extractor.clone();
        let task = tokio::task::spawn_blocking(move || extractor.extract(&file.name, &file.data));

        match timeout(self.file_timeout, task).await {
            Ok(Ok(Ok(text))) => FileOutcome::Extracted {
                filename: filename.clone(),
                text,
            },
            Ok(Ok(Err(e))) => {
                tracing::warn!("Skipping {}: {}", filename, e);
                skip(SkipReason::ExtractionFailed(e.to_string()))
            }
            Ok(Err(join_error)) => {
                tracing::error!("Extraction task for {} failed: {}", filename, join_error);
                skip(SkipReason::ExtractionFailed(format!("Task join error: {}", join_error)))
            }
            Err(_) => {
                tracing::error!(
                    "Extraction of {} timed out after {}s",
                    filename,
                    self.file_timeout.as_secs()
                );
                skip(SkipReason::ExtractionFailed(format!(
                    "timed out after {}s",
                    self.file_timeout.as_secs()
                )))
            }
        }
    }

    /// Embed and insert every chunk through a bounded worker pool
    async fn embed_and_store(
        &self,
        chunks: Vec<Chunk>,
        collection: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChunkOutcome>> {
        let semaphore = Semaphore::new(self.embedding_workers);
        // Set on the first index failure so queued chunks are not dispatched
        let abort = CancellationToken::new();

        let futures = chunks.into_iter().map(|chunk| {
            let semaphore = &semaphore;
            let abort = &abort;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::internal(format!("Embedding worker pool closed: {}", e)))?;

                if cancel.is_cancelled() || abort.is_cancelled() {
                    return Ok::<_, Error>(ChunkOutcome::NotDispatched);
                }

                let outcome = self.store_chunk(chunk, collection).await;
                if matches!(outcome, ChunkOutcome::IndexFailed(_)) {
                    abort.cancel();
                }
                Ok(outcome)
            }
        });

        join_all(futures).await.into_iter().collect()
    }

    async fn store_chunk(&self, chunk: Chunk, collection: &str) -> ChunkOutcome {
        let chunk_id = chunk.chunk_id;

        let embedding = match self
            .embed_retry
            .run("embed", || self.embedder.embed(&chunk.content))
            .await
        {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!("Dropping chunk {} after embedding failure: {}", chunk_id, e);
                return ChunkOutcome::EmbedFailed(FailedChunk {
                    chunk_id,
                    error: e.to_string(),
                });
            }
        };

        let entry = chunk.into_entry(embedding);
        let id = entry.id;
        let attempts = AtomicU32::new(0);
        match self
            .index_retry
            .run("insert", || {
                let retried = attempts.fetch_add(1, Ordering::Relaxed) > 0;
                self.insert_entry(collection, entry.clone(), retried)
            })
            .await
        {
            Ok(()) => {
                tracing::debug!("Stored chunk {} as {}", chunk_id, id);
                ChunkOutcome::Stored(id)
            }
            Err(e) => ChunkOutcome::IndexFailed(e),
        }
    }

    /// Insert one entry. On a retry, a duplicate id whose stored text
    /// matches is the earlier attempt's write landing after its timeout.
    async fn insert_entry(&self, collection: &str, entry: IndexEntry, retried: bool) -> Result<()> {
        let id = entry.id;
        let content = entry.content.clone();

        match self.index.insert(collection, entry).await {
            Err(Error::DuplicateId(message)) if retried => {
                let stored = self.index.content(collection, id).await?;
                if stored.as_deref() == Some(content.as_str()) {
                    tracing::debug!("Entry {} already stored by an earlier attempt", id);
                    Ok(())
                } else {
                    Err(Error::DuplicateId(message))
                }
            }
            result => result,
        }
    }
}

fn log_stage(stage: IngestStage, batch_id: Uuid, collection: &str) {
    tracing::info!("Batch {} -> {} (collection '{}')", batch_id, stage, collection);
}
