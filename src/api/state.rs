//! Shared state for the HTTP API.

use crate::search::{EmbeddingConfig, Index};
use crate::transport::Transport;
use std::sync::Arc;

/// State shared across all API handlers.
pub struct ApiState {
    pub transport: Arc<dyn Transport>,
    pub embedding: EmbeddingConfig,
    pub api_key: String,
}

impl ApiState {
    pub fn new(
        transport: Arc<dyn Transport>,
        embedding: EmbeddingConfig,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            embedding,
            api_key: api_key.into(),
        }
    }

    /// Build the façade for one request's target index.
    pub fn index(&self, name: &str) -> Index {
        Index::new(name, self.transport.clone(), self.embedding.clone())
    }
}
