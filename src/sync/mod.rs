//! Sync sidecar: validates replication requests, bootstraps them with a
//! one-shot external process, then leaves the sync daemon running.

pub mod process;

use crate::config::SidecarConfig;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use std::sync::Arc;

use process::SyncJob;

/// Build the sidecar router.
pub fn router(config: Arc<SidecarConfig>) -> Router {
    Router::new().route("/sync", post(sync)).with_state(config)
}

async fn sync(State(config): State<Arc<SidecarConfig>>, Json(payload): Json<Value>) -> Response {
    let job = match validate(&payload) {
        Ok(job) => job,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match process::run(&config, &job).await {
        Ok(()) => Json(payload).into_response(),
        Err(error) => {
            tracing::error!(%error, "sync bootstrap failed");
            (StatusCode::BAD_REQUEST, format!("Failed to sync: {error}")).into_response()
        }
    }
}

/// Check the request shape and pull out the connection details and schema.
fn validate(payload: &Value) -> Result<SyncJob, &'static str> {
    let source = payload.get("source").ok_or("source is missing")?;

    let connection: Option<Vec<String>> = ["source_host", "source_port", "source_user", "source_password"]
        .iter()
        .map(|key| source.get(*key).map(plain_string))
        .collect();
    let Some(connection) = connection else {
        return Err("invalid connection details");
    };

    let schema = payload.get("schema").ok_or("schema is missing")?;

    let [host, port, user, password] = connection
        .try_into()
        .unwrap_or_else(|_| unreachable!("four connection keys"));
    Ok(SyncJob {
        host,
        port,
        user,
        password,
        schema: schema.clone(),
    })
}

/// Environment-variable rendering of a JSON scalar: strings unquoted,
/// everything else as its JSON text (ports commonly arrive as numbers).
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
