//! Error types shared across the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error wrapping the domain-specific variants.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures raised by the search orchestration subsystem.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A polled ML task reached the FAILED state. Carries the raw final
    /// task document for diagnosis.
    #[error("backend task {task_id} failed: {response}")]
    TaskFailed {
        task_id: String,
        response: serde_json::Value,
    },

    /// Reserved: a model finished registration but never became deployable.
    #[error("model {model_id} is not deployed")]
    ModelNotReady { model_id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bulk API answered 2xx but reported per-document errors.
    #[error("bulk request rejected: {0}")]
    BulkRejected(serde_json::Value),

    /// The backend answered 2xx but the payload is missing an expected field.
    #[error("unexpected {context} response: {response}")]
    UnexpectedResponse {
        context: &'static str,
        response: serde_json::Value,
    },
}

/// Low-level REST transport failures. These propagate unmodified through the
/// orchestration layer; there is no retry policy at this level.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Configuration loading failures. Missing required properties fail fast at
/// startup rather than surfacing mid-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}
