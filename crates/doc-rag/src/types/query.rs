//! Query request types

use serde::{Deserialize, Serialize};

/// How retrieved chunks are turned into grounding context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPolicy {
    /// Only the nearest chunk
    TopOnly,
    /// Every retrieved chunk, nearest first
    #[default]
    AllRanked,
}

/// Per-request generation settings.
///
/// Every field is optional; an unset field falls back to the configured
/// default, and a set field is always applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams {
    /// Generation model, overriding `llm.generate_model`
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature, overriding `llm.temperature`
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Chunks to retrieve, overriding `query.n_results`
    #[serde(default)]
    pub n_results: Option<usize>,
    /// Context assembly, overriding `query.context_policy`
    #[serde(default)]
    pub context_policy: Option<ContextPolicy>,
}

impl ModelParams {
    /// Set the generation model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the number of chunks to retrieve
    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = Some(n_results);
        self
    }

    /// Set the context policy
    pub fn with_context_policy(mut self, policy: ContextPolicy) -> Self {
        self.context_policy = Some(policy);
        self
    }
}

/// Retrieval-only request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to embed and search with
    pub question: String,
    /// Number of chunks to retrieve (default: `query.n_results`)
    #[serde(default)]
    pub n_results: Option<usize>,
}

/// Retrieve-then-generate request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// The question to answer
    pub question: String,
    /// Generation settings
    #[serde(flatten)]
    pub params: ModelParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_request_flattens_params() {
        let request: AnswerRequest = serde_json::from_str(
            r#"{"question": "What color is the sky?", "temperature": 0.7, "context_policy": "top_only"}"#,
        )
        .unwrap();

        assert_eq!(request.question, "What color is the sky?");
        assert_eq!(request.params.temperature, Some(0.7));
        assert_eq!(request.params.context_policy, Some(ContextPolicy::TopOnly));
        assert!(request.params.model.is_none());
        assert!(request.params.n_results.is_none());
    }
}
