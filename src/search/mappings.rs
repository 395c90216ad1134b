//! Field mapping introspection and mutation.

use crate::error::Result;
use crate::search::VECTOR_FIELD_TYPE;
use crate::transport::Transport;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Reads and extends the field mappings of one index.
pub struct IndexMappings {
    index: String,
    transport: Arc<dyn Transport>,
}

impl IndexMappings {
    pub fn new(index: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            index: index.into(),
            transport,
        }
    }

    /// Names of all vector-typed properties currently mapped.
    pub async fn vector_field_names(&self) -> Result<BTreeSet<String>> {
        let response = self
            .transport
            .send(Method::GET, &format!("/{}/_mapping", self.index), None)
            .await?;

        let properties = response
            .pointer(&format!("/{}/mappings/properties", self.index))
            .and_then(Value::as_object);

        Ok(properties
            .map(|properties| {
                properties
                    .iter()
                    .filter(|(_, schema)| {
                        schema.get("type").and_then(Value::as_str) == Some(VECTOR_FIELD_TYPE)
                    })
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Add or replace mapping properties.
    pub async fn put_properties(&self, properties: Value) -> Result<()> {
        self.transport
            .send(
                Method::PUT,
                &format!("/{}/_mapping", self.index),
                Some(&json!({"properties": properties})),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::FakeTransport;

    #[tokio::test]
    async fn returns_only_vector_typed_properties() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::GET,
            "/docs/_mapping",
            json!({
                "docs": {
                    "mappings": {
                        "properties": {
                            "title": {"type": "text"},
                            "title_retake_embedding": {"type": "knn_vector", "dimension": 384},
                            "body_retake_embedding": {"type": "knn_vector", "dimension": 384},
                        }
                    }
                }
            }),
        );

        let mappings = IndexMappings::new("docs", transport);
        let fields = mappings
            .vector_field_names()
            .await
            .expect("mapping introspection");

        let expected: BTreeSet<String> = ["title_retake_embedding", "body_retake_embedding"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(fields, expected);
    }

    #[tokio::test]
    async fn empty_mapping_yields_no_fields() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::GET,
            "/docs/_mapping",
            json!({"docs": {"mappings": {}}}),
        );

        let mappings = IndexMappings::new("docs", transport);
        let fields = mappings
            .vector_field_names()
            .await
            .expect("mapping introspection");

        assert!(fields.is_empty());
    }
}
