//! Ingest pipeline management for embedding generation.

use crate::error::{Result, SearchError, TransportError};
use crate::transport::Transport;
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;

/// Ingest pipeline management handle.
pub struct IngestPipelines {
    transport: Arc<dyn Transport>,
}

impl IngestPipelines {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch a pipeline definition; `None` when it does not exist.
    pub async fn find(&self, pipeline_id: &str) -> Result<Option<Value>> {
        match self
            .transport
            .send(Method::GET, &format!("/_ingest/pipeline/{pipeline_id}"), None)
            .await
        {
            Ok(response) => Ok(Some(response)),
            Err(TransportError::Status { status: 404, .. }) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Create an empty pipeline.
    pub async fn create(&self, pipeline_id: &str) -> Result<()> {
        self.transport
            .send(
                Method::PUT,
                &format!("/_ingest/pipeline/{pipeline_id}"),
                Some(&json!({
                    "description": "Embedding generation pipeline",
                    "processors": [],
                })),
            )
            .await?;
        tracing::info!(pipeline_id, "created ingest pipeline");
        Ok(())
    }

    /// Append `processor` to an existing pipeline, preserving prior
    /// processors.
    pub async fn append_processor(&self, pipeline_id: &str, processor: Value) -> Result<()> {
        let path = format!("/_ingest/pipeline/{pipeline_id}");
        let current = self.transport.send(Method::GET, &path, None).await?;

        // The get API wraps the definition under the pipeline id.
        let mut definition = match current.get(pipeline_id) {
            Some(inner) => inner.clone(),
            None => current,
        };

        let Some(body) = definition.as_object_mut() else {
            return Err(SearchError::UnexpectedResponse {
                context: "pipeline definition",
                response: definition,
            }
            .into());
        };
        match body
            .entry("processors")
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(processors) => processors.push(processor),
            other => {
                return Err(SearchError::UnexpectedResponse {
                    context: "pipeline processors",
                    response: other.clone(),
                }
                .into());
            }
        }

        self.transport
            .send(Method::PUT, &path, Some(&definition))
            .await?;
        Ok(())
    }
}
