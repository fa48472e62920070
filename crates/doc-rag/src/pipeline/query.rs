//! Question answering: embed, retrieve, synthesize

use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{AnswerSynthesizer, PromptBuilder};
use crate::processing::RetryPolicy;
use crate::providers::{EmbeddingProvider, LlmProvider, VectorIndex};
use crate::types::{Answer, ContextPolicy, ModelParams, Retrieval};

/// Orchestrates query embedding, retrieval and answer synthesis against
/// one collection
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    synthesizer: AnswerSynthesizer,
    embed_retry: RetryPolicy,
    index_retry: RetryPolicy,
    default_model: String,
    default_temperature: f32,
    default_n_results: usize,
    default_policy: ContextPolicy,
}

impl QueryPipeline {
    /// Create a pipeline from configuration and providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let retry = config.llm.retry_policy();
        Self {
            embedder,
            index,
            synthesizer: AnswerSynthesizer::new(llm, retry),
            embed_retry: retry,
            index_retry: RetryPolicy::new(
                config.llm.max_attempts,
                Duration::from_millis(config.llm.retry_backoff_ms),
                Duration::from_secs(config.vector_db.timeout_secs),
            ),
            default_model: config.llm.generate_model.clone(),
            default_temperature: config.llm.temperature,
            default_n_results: config.query.n_results,
            default_policy: config.query.context_policy,
        }
    }

    /// Configured number of chunks per question
    pub fn default_n_results(&self) -> usize {
        self.default_n_results
    }

    /// Retrieve the `n_results` chunks nearest to `question`.
    ///
    /// An empty or missing collection yields [`Retrieval::NoResults`].
    pub async fn retrieve(
        &self,
        question: &str,
        collection: &str,
        n_results: usize,
    ) -> Result<Retrieval> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }
        if collection.trim().is_empty() {
            return Err(Error::InvalidInput("collection name must not be empty".to_string()));
        }
        if n_results == 0 {
            return Err(Error::InvalidInput("n_results must be greater than zero".to_string()));
        }

        tracing::debug!("Embedding question for collection '{}'", collection);
        let embedding = self
            .embed_retry
            .run("embed", || self.embedder.embed(question))
            .await?;

        let retrieval = self
            .index_retry
            .run("query", || self.index.query(collection, &embedding, n_results))
            .await?;

        match &retrieval {
            Retrieval::Found(chunks) => tracing::info!(
                "Retrieved {} chunks from '{}' (nearest distance {:.4})",
                chunks.len(),
                collection,
                chunks.first().map(|c| c.distance).unwrap_or_default()
            ),
            Retrieval::NoResults => {
                tracing::info!("No results in collection '{}'", collection)
            }
        }

        Ok(retrieval)
    }

    /// Retrieve context for `question` and generate an answer from it.
    ///
    /// No results is not an error: synthesis still runs with an empty
    /// context so the model answers that it does not know.
    pub async fn answer(
        &self,
        question: &str,
        collection: &str,
        params: &ModelParams,
    ) -> Result<Answer> {
        let n_results = params.n_results.unwrap_or(self.default_n_results);
        let policy = params.context_policy.unwrap_or(self.default_policy);
        let model = params.model.as_deref().unwrap_or(&self.default_model);
        let temperature = params.temperature.unwrap_or(self.default_temperature);

        if !(0.0..=2.0).contains(&temperature) {
            return Err(Error::InvalidInput(format!(
                "temperature {} is outside [0, 2]",
                temperature
            )));
        }
        if model.trim().is_empty() {
            return Err(Error::InvalidInput("model must not be empty".to_string()));
        }

        let retrieval = self.retrieve(question, collection, n_results).await?;
        let context = PromptBuilder::build_context(policy, &retrieval);
        let context_found = !retrieval.is_empty();

        let answer = self
            .synthesizer
            .synthesize(question, &context, model, temperature)
            .await?;

        let sources = match (retrieval, policy) {
            (Retrieval::Found(mut chunks), ContextPolicy::TopOnly) => {
                chunks.truncate(1);
                chunks
            }
            (Retrieval::Found(chunks), ContextPolicy::AllRanked) => chunks,
            (Retrieval::NoResults, _) => Vec::new(),
        };

        Ok(Answer {
            answer,
            context,
            sources,
            context_found,
            model: model.to_string(),
        })
    }
}
