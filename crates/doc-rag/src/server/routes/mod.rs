//! API routes for the RAG server

pub mod collections;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/collections", get(collections::list_collections))
        // Ingestion - with larger body limit for file uploads
        .route(
            "/collections/:name/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/collections/:name/retrieve", post(query::retrieve))
        .route("/collections/:name/answer", post(query::answer))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "doc-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented generation over named document collections",
        "endpoints": {
            "GET /api/collections": "List collections with entry counts",
            "POST /api/collections/:name/ingest": "Upload pdf, docx or txt files into a collection",
            "POST /api/collections/:name/retrieve": "Ranked chunks for a question",
            "POST /api/collections/:name/answer": "Grounded answer for a question"
        }
    }))
}
