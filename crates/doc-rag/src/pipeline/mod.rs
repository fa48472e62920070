//! Ingestion and query pipelines behind a single entry point

mod ingest;
mod query;

pub use ingest::{IngestStage, IngestionPipeline};
pub use query::QueryPipeline;

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::processing::CancellationToken;
use crate::providers::{
    EmbeddingProvider, LlmProvider, LocalVectorIndex, OllamaProvider, VectorIndex,
};
use crate::types::{Answer, CollectionInfo, IngestStatus, ModelParams, Retrieval, SourceFile};

/// The four operations a front end calls: ingest, retrieve, answer and
/// list collections
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
}

impl RagPipeline {
    /// Build a pipeline backed by Ollama and the on-disk index in
    /// `vector_db.storage_path`
    pub fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let (embedder, llm) = OllamaProvider::new(&config.llm)?.split();
        let index = LocalVectorIndex::open(&config.vector_db.storage_path)?;
        tracing::info!(
            "Vector index at {} (embedding model {}, generation model {})",
            config.vector_db.storage_path.display(),
            config.llm.embed_model,
            config.llm.generate_model
        );

        Self::with_providers(config, Arc::new(embedder), Arc::new(llm), Arc::new(index))
    }

    /// Build a pipeline over explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;

        let ingestion = IngestionPipeline::new(&config, embedder.clone(), index.clone())?;
        let query = QueryPipeline::new(&config, embedder.clone(), index.clone(), llm.clone());

        Ok(Self {
            config,
            embedder,
            llm,
            index,
            ingestion,
            query,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Extract, chunk, embed and store a batch of files into `collection`
    pub async fn ingest(&self, files: Vec<SourceFile>, collection: &str) -> Result<IngestStatus> {
        self.ingestion.ingest(files, collection).await
    }

    /// [`ingest`](Self::ingest) with batch-level cancellation
    pub async fn ingest_with_cancel(
        &self,
        files: Vec<SourceFile>,
        collection: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestStatus> {
        self.ingestion
            .ingest_with_cancel(files, collection, cancel)
            .await
    }

    /// Ranked chunks for `question`; `n_results` defaults to `query.n_results`
    pub async fn query_retrieve(
        &self,
        question: &str,
        collection: &str,
        n_results: Option<usize>,
    ) -> Result<Retrieval> {
        let n_results = n_results.unwrap_or_else(|| self.query.default_n_results());
        self.query.retrieve(question, collection, n_results).await
    }

    /// Generated answer to `question`, grounded in `collection`
    pub async fn query_answer(
        &self,
        question: &str,
        collection: &str,
        params: &ModelParams,
    ) -> Result<Answer> {
        self.query.answer(question, collection, params).await
    }

    /// All collection names, sorted
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.index.list_collections().await
    }

    /// All collections with their entry counts
    pub async fn collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut infos = Vec::new();
        for name in self.index.list_collections().await? {
            let entries = self.index.count(&name).await?;
            infos.push(CollectionInfo { name, entries });
        }
        Ok(infos)
    }

    /// Whether the embedding, generation and index backends respond
    pub async fn health_check(&self) -> bool {
        let embedder = self.embedder.health_check().await.unwrap_or(false);
        let llm = self.llm.health_check().await.unwrap_or(false);
        let index = self.index.health_check().await.unwrap_or(false);

        if !(embedder && llm && index) {
            tracing::warn!(
                "Backend health: {} embedder={}, {} llm={}, {} index={}",
                self.embedder.name(),
                embedder,
                self.llm.name(),
                llm,
                self.index.name(),
                index
            );
        }
        embedder && llm && index
    }
}
