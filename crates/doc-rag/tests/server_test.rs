mod common;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use common::{harness, test_config, txt};
use doc_rag::server::routes::{collections, query};
use doc_rag::server::state::AppState;
use doc_rag::types::{AnswerRequest, ModelParams, QueryRequest};

fn state(dir: &std::path::Path) -> AppState {
    AppState::new(harness(test_config(dir)).pipeline)
}

#[tokio::test]
async fn test_retrieve_handler_reports_no_results() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let Json(response) = query::retrieve(
        State(state.clone()),
        Path("fresh".to_string()),
        Json(QueryRequest {
            question: "anything there?".to_string(),
            n_results: None,
        }),
    )
    .await
    .unwrap();

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["collection"], "fresh");
    assert_eq!(body["no_results"], true);
    assert_eq!(body["message"], "No results found.");

    let Json(listed) = collections::list_collections(State(state)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "fresh");
    assert_eq!(listed[0].entries, 0);
}

#[tokio::test]
async fn test_retrieve_and_answer_handlers_after_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    state
        .pipeline()
        .ingest(vec![txt("sky.txt", "The sky is blue. Grass is green.")], "colors")
        .await
        .unwrap();

    let Json(response) = query::retrieve(
        State(state.clone()),
        Path("colors".to_string()),
        Json(QueryRequest {
            question: "What color is the sky?".to_string(),
            n_results: Some(3),
        }),
    )
    .await
    .unwrap();
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["results"][0]["content"], "The sky is blue. Grass is green.");

    let Json(answer) = query::answer(
        State(state),
        Path("colors".to_string()),
        Json(AnswerRequest {
            question: "What color is the sky?".to_string(),
            params: ModelParams::default().with_model("mistral"),
        }),
    )
    .await
    .unwrap();
    assert_eq!(answer.model, "mistral");
    assert!(answer.context_found);
    assert!(answer.context.contains("blue"));
}

#[tokio::test]
async fn test_invalid_request_maps_to_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let err = query::retrieve(
        State(state),
        Path("colors".to_string()),
        Json(QueryRequest {
            question: "".to_string(),
            n_results: None,
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
