//! Polling of asynchronous ML plugin tasks to a terminal state.

use crate::error::{Result, SearchError};
use crate::transport::Transport;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Interval between task status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// State of an asynchronous backend task.
///
/// The backend reports a number of intermediate states ("CREATED",
/// "RUNNING", ...); only two are terminal. Everything else means keep
/// polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Completed,
    Failed,
    Pending(String),
}

impl TaskState {
    fn parse(raw: &str) -> Self {
        match raw {
            "COMPLETED" => TaskState::Completed,
            "FAILED" => TaskState::Failed,
            other => TaskState::Pending(other.to_string()),
        }
    }
}

/// Polls a task until it completes or fails.
///
/// There is no upper bound on attempts: provisioning tasks (model
/// registration, deployment) have no useful local deadline. Callers that need
/// one can wrap [`TaskPoller::await_completion`] in `tokio::time::timeout`.
pub struct TaskPoller {
    transport: Arc<dyn Transport>,
    interval: Duration,
}

impl TaskPoller {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval. Tests use `Duration::ZERO`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Block until `task_id` reaches a terminal state.
    ///
    /// Returns the final task document on completion; callers index into it
    /// for task-specific results such as the registered `model_id`. A FAILED
    /// task surfaces as [`SearchError::TaskFailed`] with no further polls.
    pub async fn await_completion(&self, task_id: &str) -> Result<Value> {
        let path = format!("/_plugins/_ml/tasks/{task_id}");

        loop {
            let response = self.transport.send(Method::GET, &path, None).await?;

            tracing::info!(task_id, %response, "task status");

            let state = response
                .get("state")
                .and_then(Value::as_str)
                .map(TaskState::parse)
                .ok_or_else(|| SearchError::UnexpectedResponse {
                    context: "task status",
                    response: response.clone(),
                })?;

            match state {
                TaskState::Completed => return Ok(response),
                TaskState::Failed => {
                    return Err(SearchError::TaskFailed {
                        task_id: task_id.to_string(),
                        response,
                    }
                    .into());
                }
                TaskState::Pending(_) => tokio::time::sleep(self.interval).await,
            }
        }
    }
}
