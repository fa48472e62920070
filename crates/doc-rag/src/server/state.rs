//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RagPipeline>,
}

impl AppState {
    /// Wrap a pipeline for sharing across handlers
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// The pipeline behind every endpoint
    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.pipeline.config()
    }
}
