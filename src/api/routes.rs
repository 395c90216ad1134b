//! API route handlers for index lifecycle, ingestion, and search.

use super::state::ApiState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct CreateIndexRequest {
    index_name: String,
}

#[derive(Deserialize)]
pub(super) struct UpsertRequest {
    index_name: String,
    documents: Vec<Value>,
    ids: Vec<Value>,
}

#[derive(Deserialize)]
pub(super) struct SearchRequest {
    index_name: String,
    dsl: Value,
}

#[derive(Deserialize)]
pub(super) struct CreateFieldRequest {
    index_name: String,
    field_names: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct StatusResponse {
    success: bool,
    message: String,
}

pub(super) async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub(super) async fn create_index(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateIndexRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let index = state.index(&request.index_name);
    index.ensure_exists().await.map_err(error_response)?;

    Ok(Json(StatusResponse {
        success: true,
        message: format!("index {} available", request.index_name),
    }))
}

pub(super) async fn upsert(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let index = state.index(&request.index_name);
    index
        .upsert(&request.documents, &request.ids)
        .await
        .map_err(error_response)?;

    Ok(Json(StatusResponse {
        success: true,
        message: format!("upserted {} documents", request.documents.len()),
    }))
}

pub(super) async fn search(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let index = state.index(&request.index_name);
    let response = index.search(request.dsl).await.map_err(error_response)?;

    Ok(Json(response))
}

/// Provision semantic search on the named fields, then reindex so documents
/// ingested before provisioning receive embeddings too.
pub(super) async fn create_field(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateFieldRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let index = state.index(&request.index_name);
    index
        .register_neural_search_fields(&request.field_names)
        .await
        .map_err(error_response)?;
    index.reindex().await.map_err(error_response)?;

    Ok(Json(StatusResponse {
        success: true,
        message: format!(
            "registered {} neural search fields",
            request.field_names.len()
        ),
    }))
}

fn error_response(error: crate::Error) -> (StatusCode, String) {
    let status = match &error {
        crate::Error::Search(crate::error::SearchError::InvalidArgument(_)) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(%error, "request failed");
    (status, error.to_string())
}
