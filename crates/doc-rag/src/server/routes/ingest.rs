//! Document ingestion endpoint

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IngestStatus, SourceFile};

/// POST /api/collections/:name/ingest - Upload files into a collection
///
/// Every multipart field carrying a file name is treated as one file.
pub async fn ingest_files(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<IngestStatus>> {
    let start = Instant::now();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring multipart field without file name: {:?}", field.name());
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file '{}': {}", filename, e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push(SourceFile::new(filename, data.to_vec()));
    }

    let status = state.pipeline().ingest(files, &collection).await?;

    tracing::info!(
        "Ingestion into '{}' finished in {:.1}s: {}",
        collection,
        start.elapsed().as_secs_f64(),
        status.summary()
    );

    Ok(Json(status))
}
