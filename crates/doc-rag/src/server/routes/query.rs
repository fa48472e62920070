//! Retrieval and answer endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{Answer, AnswerRequest, QueryRequest, Retrieval, RetrievedChunk, NO_RESULTS_MESSAGE};

/// Body of a retrieve response
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RetrieveResponse {
    /// Ranked matches, nearest first
    Found {
        collection: String,
        results: Vec<RetrievedChunk>,
    },
    /// The collection holds nothing
    NoResults {
        collection: String,
        no_results: bool,
        message: &'static str,
    },
}

impl RetrieveResponse {
    fn new(collection: String, retrieval: Retrieval) -> Self {
        match retrieval {
            Retrieval::Found(results) => Self::Found { collection, results },
            Retrieval::NoResults => Self::NoResults {
                collection,
                no_results: true,
                message: NO_RESULTS_MESSAGE,
            },
        }
    }
}

/// POST /api/collections/:name/retrieve - Ranked chunks for a question
pub async fn retrieve(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RetrieveResponse>> {
    tracing::info!("Retrieve from '{}': \"{}\"", collection, request.question);

    let retrieval = state
        .pipeline()
        .query_retrieve(&request.question, &collection, request.n_results)
        .await?;

    Ok(Json(RetrieveResponse::new(collection, retrieval)))
}

/// POST /api/collections/:name/answer - Grounded answer for a question
pub async fn answer(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<Answer>> {
    let start = Instant::now();
    tracing::info!("Answer from '{}': \"{}\"", collection, request.question);

    let answer = state
        .pipeline()
        .query_answer(&request.question, &collection, &request.params)
        .await?;

    tracing::info!(
        "Answered with {} in {}ms ({} sources, context found: {})",
        answer.model,
        start.elapsed().as_millis(),
        answer.sources.len(),
        answer.context_found
    );

    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_results_body() {
        let body = serde_json::to_value(RetrieveResponse::new("docs".to_string(), Retrieval::NoResults)).unwrap();
        assert_eq!(body["no_results"], true);
        assert_eq!(body["message"], "No results found.");
        assert_eq!(body["collection"], "docs");
    }
}
