//! Bearer-token authentication for the gateway.

use super::state::ApiState;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Reject any non-preflight request that does not carry the configured
/// bearer token.
pub(super) async fn require_bearer(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if token_matches(authorization, &state.api_key) {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, "invalid or missing bearer token").into_response()
    }
}

/// `Authorization: Bearer <token>`, scheme case-insensitive.
fn token_matches(header: Option<&str>, api_key: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let mut parts = header.trim().splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) => {
            scheme.eq_ignore_ascii_case("bearer") && token.trim() == api_key
        }
        _ => false,
    }
}
