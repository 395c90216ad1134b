//! The per-index façade tying model, pipeline, settings, and mapping
//! management into the public workflows.

use crate::error::{Result, SearchError, TransportError};
use crate::search::config::EmbeddingConfig;
use crate::search::dsl;
use crate::search::mappings::IndexMappings;
use crate::search::model::ModelLifecycle;
use crate::search::pipeline::IngestPipelines;
use crate::search::settings::IndexSettings;
use crate::search::{EMBEDDING_FIELD_SUFFIX, VECTOR_FIELD_TYPE};
use crate::transport::Transport;
use reqwest::Method;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

/// One logical search index and the collaborators that provision it.
///
/// Construction is cheap and stateless; the backend holds all durable state.
/// Concurrent field registrations on the same index are not coordinated here
/// and must be serialized by the caller.
pub struct Index {
    name: String,
    pipeline_id: String,
    transport: Arc<dyn Transport>,
    settings: IndexSettings,
    mappings: IndexMappings,
    pipelines: IngestPipelines,
    lifecycle: ModelLifecycle,
    embedding: EmbeddingConfig,
}

impl Index {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        embedding: EmbeddingConfig,
    ) -> Self {
        let name = name.into();
        Self {
            pipeline_id: format!("{name}_pipeline"),
            settings: IndexSettings::new(&name, transport.clone()),
            mappings: IndexMappings::new(&name, transport.clone()),
            pipelines: IngestPipelines::new(transport.clone()),
            lifecycle: ModelLifecycle::new(transport.clone(), embedding.clone()),
            embedding,
            transport,
            name,
        }
    }

    /// Override the task poll interval. Tests use `Duration::ZERO`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.lifecycle = self.lifecycle.with_poll_interval(interval);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ingest pipeline id, a pure function of the index name.
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Create the backing index when it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        match self
            .transport
            .send(Method::GET, &format!("/{}", self.name), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(TransportError::Status { status: 404, .. }) => {
                self.transport
                    .send(Method::PUT, &format!("/{}", self.name), None)
                    .await?;
                tracing::info!(index = %self.name, "created index");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Bulk update-with-upsert of `documents` keyed 1:1 by `ids`.
    pub async fn upsert(&self, documents: &[Value], ids: &[Value]) -> Result<()> {
        if documents.len() != ids.len() {
            return Err(SearchError::InvalidArgument(format!(
                "documents and ids must have equal length ({} vs {})",
                documents.len(),
                ids.len()
            ))
            .into());
        }

        let mut lines = Vec::with_capacity(documents.len() * 2);
        for (document, id) in documents.iter().zip(ids) {
            lines.push(json!({"update": {"_index": self.name, "_id": id}}));
            lines.push(json!({"doc": document, "doc_as_upsert": true}));
        }

        let response = self.transport.send_bulk("/_bulk", &lines).await?;
        if response
            .get("errors")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(SearchError::BulkRejected(response).into());
        }

        tracing::info!(index = %self.name, count = documents.len(), "bulk upserted documents");
        Ok(())
    }

    /// Execute a search, rewriting the query for neural clauses first.
    ///
    /// Model resolution here is lookup-only. On a backend with no registered
    /// default model the query runs without injection; the backend rejects
    /// any `neural` clause that needed one.
    pub async fn search(&self, dsl: Value) -> Result<Value> {
        let model_id = self.lifecycle.lookup().await?;
        let vector_fields = self.mappings.vector_field_names().await?;
        let body = dsl::augment(dsl, model_id.as_deref(), &vector_fields);

        Ok(self
            .transport
            .send(Method::POST, &format!("/{}/_search", self.name), Some(&body))
            .await?)
    }

    /// Provision `fields` for semantic search end to end.
    ///
    /// Deploys the default embedding model, wires the ingest pipeline into
    /// the index settings, maps each field to its embedding sibling in a
    /// `text_embedding` processor, and finally adds the sibling vector
    /// mappings. Documents ingested before this completes have no embeddings
    /// until a later [`Index::reindex`].
    pub async fn register_neural_search_fields(&self, fields: &[String]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let model_id = self.lifecycle.ensure_ready().await?;

        if self.pipelines.find(&self.pipeline_id).await?.is_none() {
            self.pipelines.create(&self.pipeline_id).await?;
        }

        self.settings
            .apply(&json!({
                "index.knn": true,
                "default_pipeline": self.pipeline_id,
            }))
            .await?;

        let field_map: Map<String, Value> = fields
            .iter()
            .map(|field| {
                (
                    field.clone(),
                    Value::String(format!("{field}{EMBEDDING_FIELD_SUFFIX}")),
                )
            })
            .collect();
        self.pipelines
            .append_processor(
                &self.pipeline_id,
                json!({"text_embedding": {"model_id": model_id, "field_map": field_map}}),
            )
            .await?;

        let properties: Map<String, Value> = fields
            .iter()
            .map(|field| {
                (
                    format!("{field}{EMBEDDING_FIELD_SUFFIX}"),
                    json!({
                        "type": VECTOR_FIELD_TYPE,
                        "dimension": self.embedding.dimension,
                        "method": {"name": "hnsw", "engine": self.embedding.engine},
                    }),
                )
            })
            .collect();
        self.mappings.put_properties(Value::Object(properties)).await?;

        tracing::info!(index = %self.name, fields = fields.len(), "registered neural search fields");
        Ok(())
    }

    /// Re-run the ingest pipeline over every existing document by reindexing
    /// the index onto itself.
    pub async fn reindex(&self) -> Result<()> {
        self.transport
            .send(
                Method::POST,
                "/_reindex",
                Some(&json!({
                    "source": {"index": self.name},
                    "dest": {"index": self.name},
                })),
            )
            .await?;
        tracing::info!(index = %self.name, "reindex triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::testing::{FakeTransport, RecordedCall};

    fn index(transport: Arc<FakeTransport>) -> Index {
        Index::new("docs", transport, EmbeddingConfig::default())
            .with_poll_interval(Duration::ZERO)
    }

    fn no_hits() -> Value {
        json!({"hits": {"hits": []}})
    }

    #[tokio::test]
    async fn upsert_builds_one_update_as_upsert_op_per_document() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::POST, "/_bulk", json!({"errors": false, "items": []}));

        index(transport.clone())
            .upsert(
                &[json!({"a": 1}), json!({"a": 2})],
                &[json!("x"), json!("y")],
            )
            .await
            .expect("bulk upsert");

        let call = transport.calls().pop().expect("bulk call");
        let lines = call.body.expect("bulk lines");
        assert_eq!(
            lines,
            json!([
                {"update": {"_index": "docs", "_id": "x"}},
                {"doc": {"a": 1}, "doc_as_upsert": true},
                {"update": {"_index": "docs", "_id": "y"}},
                {"doc": {"a": 2}, "doc_as_upsert": true},
            ])
        );
    }

    #[tokio::test]
    async fn upsert_rejects_mismatched_lengths_before_any_request() {
        let transport = Arc::new(FakeTransport::new());

        let error = index(transport.clone())
            .upsert(&[json!({"a": 1})], &[json!("x"), json!("y")])
            .await
            .expect_err("length mismatch");

        assert!(matches!(
            error,
            Error::Search(SearchError::InvalidArgument(_))
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn upsert_surfaces_bulk_item_errors() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::POST,
            "/_bulk",
            json!({"errors": true, "items": [{"update": {"status": 400}}]}),
        );

        let error = index(transport)
            .upsert(&[json!({"a": 1})], &[json!("x")])
            .await
            .expect_err("bulk rejected");

        assert!(matches!(error, Error::Search(SearchError::BulkRejected(_))));
    }

    #[tokio::test]
    async fn search_injects_model_and_excludes_vector_fields() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::POST,
            "/_plugins/_ml/models/_search",
            json!({"hits": {"hits": [{"_id": "m1"}]}}),
        );
        transport.respond(
            Method::GET,
            "/docs/_mapping",
            json!({
                "docs": {
                    "mappings": {
                        "properties": {
                            "title": {"type": "text"},
                            "title_retake_embedding": {"type": "knn_vector"},
                        }
                    }
                }
            }),
        );
        transport.respond(Method::POST, "/docs/_search", json!({"hits": {"hits": []}}));

        index(transport.clone())
            .search(json!({
                "query": {"neural": {"title_retake_embedding": {"query_text": "rust", "k": 3}}}
            }))
            .await
            .expect("search succeeds");

        let executed = transport
            .calls()
            .into_iter()
            .find(|call| call.path == "/docs/_search")
            .expect("search call");
        let body = executed.body.expect("search body");
        assert_eq!(
            body["query"]["neural"]["title_retake_embedding"]["model_id"],
            "m1"
        );
        assert_eq!(
            body["_source"]["excludes"],
            json!(["title_retake_embedding"])
        );
    }

    #[tokio::test]
    async fn search_without_registered_model_runs_the_query_unmodified() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::POST, "/_plugins/_ml/models/_search", no_hits());
        transport.respond(
            Method::GET,
            "/docs/_mapping",
            json!({"docs": {"mappings": {}}}),
        );
        transport.respond(Method::POST, "/docs/_search", json!({"hits": {"hits": []}}));

        index(transport.clone())
            .search(json!({"query": {"match_all": {}}}))
            .await
            .expect("search succeeds");

        let executed = transport
            .calls()
            .into_iter()
            .find(|call| call.path == "/docs/_search")
            .expect("search call");
        let body = executed.body.expect("search body");
        assert_eq!(body["query"], json!({"match_all": {}}));
        assert_eq!(body["_source"]["excludes"], json!([]));
    }

    #[tokio::test]
    async fn register_neural_search_fields_is_a_noop_without_fields() {
        let transport = Arc::new(FakeTransport::new());

        index(transport.clone())
            .register_neural_search_fields(&[])
            .await
            .expect("noop");

        assert!(transport.calls().is_empty());
    }

    /// Full provisioning on a fresh backend: one group, one model
    /// (register + load + deploy), one pipeline with one processor, settings
    /// referencing the pipeline, and one vector mapping property.
    #[tokio::test]
    async fn register_neural_search_fields_provisions_a_fresh_index() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::POST, "/_plugins/_ml/model_groups/_search", no_hits());
        transport.respond(
            Method::POST,
            "/_plugins/_ml/model_groups/_register",
            json!({"model_group_id": "g1"}),
        );
        transport.respond(Method::POST, "/_plugins/_ml/models/_search", no_hits());
        transport.respond(
            Method::POST,
            "/_plugins/_ml/models/_register",
            json!({"task_id": "reg-task"}),
        );
        transport.respond(
            Method::GET,
            "/_plugins/_ml/tasks/reg-task",
            json!({"state": "COMPLETED", "model_id": "m1"}),
        );
        transport.respond(
            Method::POST,
            "/_plugins/_ml/models/m1/_load",
            json!({"task_id": "load-task"}),
        );
        transport.respond(
            Method::GET,
            "/_plugins/_ml/tasks/load-task",
            json!({"state": "COMPLETED"}),
        );
        transport.respond(
            Method::POST,
            "/_plugins/_ml/models/m1/_deploy",
            json!({"task_id": "deploy-task"}),
        );
        transport.respond(
            Method::GET,
            "/_plugins/_ml/tasks/deploy-task",
            json!({"state": "COMPLETED"}),
        );
        transport.respond_status(Method::GET, "/_ingest/pipeline/docs_pipeline", 404);
        transport.respond(
            Method::GET,
            "/_ingest/pipeline/docs_pipeline",
            json!({"docs_pipeline": {"description": "Embedding generation pipeline", "processors": []}}),
        );
        transport.respond(
            Method::PUT,
            "/_ingest/pipeline/docs_pipeline",
            json!({"acknowledged": true}),
        );
        transport.respond(Method::POST, "/docs/_close", json!({"acknowledged": true}));
        transport.respond(Method::PUT, "/docs/_settings", json!({"acknowledged": true}));
        transport.respond(Method::POST, "/docs/_open", json!({"acknowledged": true}));
        transport.respond(Method::PUT, "/docs/_mapping", json!({"acknowledged": true}));

        index(transport.clone())
            .register_neural_search_fields(&["title".to_string()])
            .await
            .expect("fields registered");

        let calls = transport.calls();

        // One group and one model were created.
        assert_eq!(count(&calls, &Method::POST, "/_plugins/_ml/model_groups/_register"), 1);
        assert_eq!(count(&calls, &Method::POST, "/_plugins/_ml/models/_register"), 1);
        assert_eq!(count(&calls, &Method::POST, "/_plugins/_ml/models/m1/_load"), 1);
        assert_eq!(count(&calls, &Method::POST, "/_plugins/_ml/models/m1/_deploy"), 1);

        // Settings reference the derived pipeline id inside the close/open
        // window.
        let settings = body_of(&calls, &Method::PUT, "/docs/_settings");
        assert_eq!(settings["default_pipeline"], "docs_pipeline");
        assert_eq!(settings["index.knn"], true);

        // The pipeline ends up with exactly one processor mapping the field
        // to its embedding sibling.
        let pipeline_puts: Vec<&RecordedCall> = calls
            .iter()
            .filter(|call| {
                call.method == Method::PUT && call.path == "/_ingest/pipeline/docs_pipeline"
            })
            .collect();
        let last_pipeline = pipeline_puts.last().expect("pipeline put");
        let processors = last_pipeline.body.as_ref().expect("pipeline body")["processors"]
            .as_array()
            .expect("processors array")
            .clone();
        assert_eq!(processors.len(), 1);
        assert_eq!(
            processors[0]["text_embedding"]["field_map"]["title"],
            "title_retake_embedding"
        );
        assert_eq!(processors[0]["text_embedding"]["model_id"], "m1");

        // The mapping gains one vector property with the default
        // dimensionality.
        let mapping = body_of(&calls, &Method::PUT, "/docs/_mapping");
        assert_eq!(
            mapping["properties"]["title_retake_embedding"],
            json!({
                "type": "knn_vector",
                "dimension": 384,
                "method": {"name": "hnsw", "engine": "lucene"},
            })
        );
    }

    #[tokio::test]
    async fn reindex_targets_the_index_onto_itself() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::POST, "/_reindex", json!({"took": 1}));

        index(transport.clone()).reindex().await.expect("reindex");

        let call = transport.calls().pop().expect("reindex call");
        assert_eq!(
            call.body.expect("reindex body"),
            json!({"source": {"index": "docs"}, "dest": {"index": "docs"}})
        );
    }

    #[tokio::test]
    async fn ensure_exists_creates_only_missing_indices() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_status(Method::GET, "/docs", 404);
        transport.respond(Method::PUT, "/docs", json!({"acknowledged": true}));

        index(transport.clone()).ensure_exists().await.expect("created");
        assert_eq!(transport.count(&Method::PUT, "/docs"), 1);

        let transport = Arc::new(FakeTransport::new());
        transport.respond(Method::GET, "/docs", json!({"docs": {}}));

        index(transport.clone()).ensure_exists().await.expect("exists");
        assert_eq!(transport.count(&Method::PUT, "/docs"), 0);
    }

    fn count(calls: &[RecordedCall], method: &Method, path: &str) -> usize {
        calls
            .iter()
            .filter(|call| call.method == *method && call.path == path)
            .count()
    }

    fn body_of(calls: &[RecordedCall], method: &Method, path: &str) -> Value {
        calls
            .iter()
            .find(|call| call.method == *method && call.path == path)
            .and_then(|call| call.body.clone())
            .unwrap_or_else(|| panic!("no body recorded for {method} {path}"))
    }
}
