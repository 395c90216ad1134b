//! Model group and model lifecycle against the ML plugin.

use crate::error::{Result, SearchError};
use crate::search::config::EmbeddingConfig;
use crate::search::task::TaskPoller;
use crate::transport::Transport;
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Model group management handle.
pub struct ModelGroups {
    transport: Arc<dyn Transport>,
}

impl ModelGroups {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Look up a model group id by name.
    pub async fn find(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .transport
            .send(
                Method::POST,
                "/_plugins/_ml/model_groups/_search",
                Some(&json!({"query": {"term": {"name.keyword": name}}, "size": 1})),
            )
            .await?;
        Ok(first_hit_id(&response))
    }

    /// Register a new model group and return its id.
    pub async fn create(&self, name: &str) -> Result<String> {
        let response = self
            .transport
            .send(
                Method::POST,
                "/_plugins/_ml/model_groups/_register",
                Some(&json!({"name": name})),
            )
            .await?;
        string_field(&response, "model_group_id", "model group registration")
    }
}

/// Model management handle.
pub struct Models {
    transport: Arc<dyn Transport>,
}

impl Models {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Look up a model id by name.
    pub async fn find(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .transport
            .send(
                Method::POST,
                "/_plugins/_ml/models/_search",
                Some(&json!({"query": {"term": {"name.keyword": name}}, "size": 1})),
            )
            .await?;
        Ok(first_hit_id(&response))
    }

    /// Start model registration; returns the task id to poll.
    pub async fn register(&self, config: &EmbeddingConfig, model_group_id: &str) -> Result<String> {
        let response = self
            .transport
            .send(
                Method::POST,
                "/_plugins/_ml/models/_register",
                Some(&json!({
                    "name": config.model_name,
                    "version": config.model_version,
                    "model_format": config.model_format,
                    "model_group_id": model_group_id,
                })),
            )
            .await?;
        string_field(&response, "task_id", "model registration")
    }

    /// Start loading a registered model; returns the task id to poll.
    pub async fn load(&self, model_id: &str) -> Result<String> {
        let response = self
            .transport
            .send(
                Method::POST,
                &format!("/_plugins/_ml/models/{model_id}/_load"),
                None,
            )
            .await?;
        string_field(&response, "task_id", "model load")
    }

    /// Start deploying a loaded model; returns the task id to poll.
    pub async fn deploy(&self, model_id: &str) -> Result<String> {
        let response = self
            .transport
            .send(
                Method::POST,
                &format!("/_plugins/_ml/models/{model_id}/_deploy"),
                None,
            )
            .await?;
        string_field(&response, "task_id", "model deploy")
    }
}

/// Drives the configured embedding model from absent to deployed.
pub struct ModelLifecycle {
    groups: ModelGroups,
    models: Models,
    poller: TaskPoller,
    config: EmbeddingConfig,
}

impl ModelLifecycle {
    pub fn new(transport: Arc<dyn Transport>, config: EmbeddingConfig) -> Self {
        Self {
            groups: ModelGroups::new(transport.clone()),
            models: Models::new(transport.clone()),
            poller: TaskPoller::new(transport),
            config,
        }
    }

    /// Override the task poll interval. Tests use `Duration::ZERO`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Resolve the configured model id without side effects.
    pub async fn lookup(&self) -> Result<Option<String>> {
        self.models.find(&self.config.model_name).await
    }

    /// Get-or-create the group and model, then load and deploy.
    ///
    /// Every step is a get-before-create, so a partial failure (model
    /// registered but never deployed) is repaired by calling again. Task
    /// failures propagate unmodified; there is no compensation.
    pub async fn ensure_ready(&self) -> Result<String> {
        let group_id = match self.groups.find(&self.config.group_name).await? {
            Some(id) => id,
            None => self.groups.create(&self.config.group_name).await?,
        };

        let model_id = match self.models.find(&self.config.model_name).await? {
            Some(id) => id,
            None => {
                let task_id = self.models.register(&self.config, &group_id).await?;
                let task = self.poller.await_completion(&task_id).await?;
                string_field(&task, "model_id", "model registration task")?
            }
        };

        tracing::info!(model_id, "loading and deploying embedding model");

        let task_id = self.models.load(&model_id).await?;
        self.poller.await_completion(&task_id).await?;

        let task_id = self.models.deploy(&model_id).await?;
        self.poller.await_completion(&task_id).await?;

        tracing::info!(model_id, "embedding model deployed");

        Ok(model_id)
    }
}

fn first_hit_id(response: &Value) -> Option<String> {
    response
        .pointer("/hits/hits/0/_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn string_field(response: &Value, field: &str, context: &'static str) -> Result<String> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SearchError::UnexpectedResponse {
                context,
                response: response.clone(),
            }
            .into()
        })
}
