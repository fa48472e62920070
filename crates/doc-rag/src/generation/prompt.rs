//! Grounding prompt template and context assembly

use crate::types::{ContextPolicy, Retrieval};

/// Separator between chunks in an all-ranked context
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounding context from a retrieval.
    ///
    /// `NoResults` produces an empty context; the prompt then leaves the
    /// model nothing to answer from.
    pub fn build_context(policy: ContextPolicy, retrieval: &Retrieval) -> String {
        let chunks = retrieval.chunks();
        match policy {
            ContextPolicy::TopOnly => chunks
                .first()
                .map(|chunk| chunk.content.clone())
                .unwrap_or_default(),
            ContextPolicy::AllRanked => chunks
                .iter()
                .map(|chunk| chunk.content.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR),
        }
    }

    /// Build the prompt that restricts the model to `context`
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            "Use the following context to answer the question. \
If you don't know the answer, say you don't know.\n\
Context: {context}\n\
Question: {question}\n\
Answer:"
        )
    }
}
