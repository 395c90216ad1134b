//! REST transport over the backend's HTTP API.

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Object-safe seam over the backend REST API.
///
/// The orchestration layer needs exactly two request shapes: an optional JSON
/// body, and the newline-delimited body of the bulk API. Implementations must
/// not retry; callers own failure policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a request with an optional JSON body and decode the JSON
    /// response. An empty response body decodes to `Value::Null`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;

    /// Perform a bulk request: each value becomes one NDJSON line.
    async fn send_bulk(&self, path: &str, lines: &[Value]) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport against a single base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Attach basic-auth credentials to every request.
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password));
        }
        builder
    }

    async fn finish(builder: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::finish(builder).await
    }

    async fn send_bulk(&self, path: &str, lines: &[Value]) -> Result<Value, TransportError> {
        // The bulk API requires a trailing newline after the last line.
        let mut body = String::new();
        for line in lines {
            body.push_str(&line.to_string());
            body.push('\n');
        }

        let builder = self
            .request(Method::POST, path)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        Self::finish(builder).await
    }
}
