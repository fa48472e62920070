//! Deterministic in-process providers shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use doc_rag::providers::{EmbeddingProvider, LlmProvider, LocalVectorIndex, VectorIndex};
use doc_rag::ingestion::{FileParser, TextExtractor};
use doc_rag::types::{IndexEntry, Retrieval};
use doc_rag::{Error, RagConfig, RagPipeline, Result, SourceFile};

pub const DIMENSIONS: usize = 64;

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

/// Bag-of-words embedding: each lowercase word increments one hashed bucket
pub fn hash_embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSIONS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        vector[(fnv1a(token) % DIMENSIONS as u64) as usize] += 1.0;
    }
    vector
}

/// Embeds with [`hash_embed`]; texts containing `poison` always fail
#[derive(Default)]
pub struct HashEmbedder {
    pub poison: Option<String>,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            poison: Some(marker.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.poison {
            if text.contains(marker.as_str()) {
                return Err(Error::embedding("connection reset by peer"));
            }
        }
        Ok(hash_embed(text))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }

    fn model(&self) -> &str {
        "hash-bow-64"
    }
}

/// One recorded generation call
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
}

/// Returns the prompt it was given, recording every call
#[derive(Default)]
pub struct EchoLlm {
    pub calls: Mutex<Vec<GenerateCall>>,
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String> {
        self.calls.lock().push(GenerateCall {
            prompt: prompt.to_string(),
            model: model.to_string(),
            temperature,
        });
        Ok(prompt.to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Local index whose inserts fail once `fail_after` entries are stored
pub struct BrokenIndex {
    pub inner: LocalVectorIndex,
    pub fail_after: usize,
    pub inserted: AtomicUsize,
}

#[async_trait]
impl VectorIndex for BrokenIndex {
    async fn get_or_create(&self, collection: &str) -> Result<()> {
        self.inner.get_or_create(collection).await
    }

    async fn insert(&self, collection: &str, entry: IndexEntry) -> Result<()> {
        if self.inserted.load(Ordering::SeqCst) >= self.fail_after {
            return Err(Error::vector_db("disk I/O error"));
        }
        self.inner.insert(collection, entry).await?;
        self.inserted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Retrieval> {
        self.inner.query(collection, embedding, n_results).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn content(&self, collection: &str, id: Uuid) -> Result<Option<String>> {
        self.inner.content(collection, id).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Local index whose first insert commits and then stalls for `stall`
pub struct SlowCommitIndex {
    pub inner: LocalVectorIndex,
    pub stall: Duration,
    pub inserts: AtomicUsize,
}

#[async_trait]
impl VectorIndex for SlowCommitIndex {
    async fn get_or_create(&self, collection: &str) -> Result<()> {
        self.inner.get_or_create(collection).await
    }

    async fn insert(&self, collection: &str, entry: IndexEntry) -> Result<()> {
        let first = self.inserts.fetch_add(1, Ordering::SeqCst) == 0;
        self.inner.insert(collection, entry).await?;
        if first {
            tokio::time::sleep(self.stall).await;
        }
        Ok(())
    }

    async fn query(&self, collection: &str, embedding: &[f32], n_results: usize) -> Result<Retrieval> {
        self.inner.query(collection, embedding, n_results).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn content(&self, collection: &str, id: Uuid) -> Result<Option<String>> {
        self.inner.content(collection, id).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "slow-commit"
    }
}

/// Parses like [`FileParser`] but blocks for `stall` on files whose name
/// contains `marker`
pub struct StallingExtractor {
    pub marker: String,
    pub stall: Duration,
}

impl TextExtractor for StallingExtractor {
    fn extract(&self, filename: &str, data: &[u8]) -> Result<String> {
        if filename.contains(self.marker.as_str()) {
            std::thread::sleep(self.stall);
        }
        FileParser::extract(filename, data)
    }
}

/// Default configuration pointed at `dir`, with fast retries
pub fn test_config(dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.vector_db.storage_path = dir.to_path_buf();
    config.llm.max_attempts = 2;
    config.llm.retry_backoff_ms = 1;
    config.llm.timeout_secs = 5;
    config.processing.parallel_files = Some(2);
    config.processing.parallel_embeddings = Some(4);
    config
}

/// A pipeline over the hash embedder, echo generator and an on-disk index
pub struct Harness {
    pub pipeline: RagPipeline,
    pub embedder: Arc<HashEmbedder>,
    pub llm: Arc<EchoLlm>,
}

pub fn harness(config: RagConfig) -> Harness {
    harness_with(config, HashEmbedder::default())
}

pub fn harness_with(config: RagConfig, embedder: HashEmbedder) -> Harness {
    let index = LocalVectorIndex::open(&config.vector_db.storage_path).unwrap();
    let embedder = Arc::new(embedder);
    let llm = Arc::new(EchoLlm::default());
    let pipeline =
        RagPipeline::with_providers(config, embedder.clone(), llm.clone(), Arc::new(index)).unwrap();
    Harness {
        pipeline,
        embedder,
        llm,
    }
}

pub fn txt(name: &str, text: &str) -> SourceFile {
    SourceFile::new(name, text.as_bytes().to_vec())
}
