//! Collection discovery endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::CollectionInfo;

/// GET /api/collections - List collections with entry counts
pub async fn list_collections(State(state): State<AppState>) -> Result<Json<Vec<CollectionInfo>>> {
    let collections = state.pipeline().collections().await?;
    Ok(Json(collections))
}
