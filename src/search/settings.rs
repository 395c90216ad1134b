//! Index settings mutation around a close/open window.

use crate::error::Result;
use crate::transport::Transport;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Applies index-level settings that cannot change while the index is open
/// (vector search enablement, default ingest pipeline).
pub struct IndexSettings {
    index: String,
    transport: Arc<dyn Transport>,
}

impl IndexSettings {
    pub fn new(index: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            index: index.into(),
            transport,
        }
    }

    /// Close the index, apply `settings` verbatim, reopen.
    ///
    /// The sequence is not atomic. The reopen runs even when the settings put
    /// fails, so a failed patch leaves the index open with its old settings
    /// rather than closed; the put error still reaches the caller first.
    pub async fn apply(&self, settings: &Value) -> Result<()> {
        self.transport
            .send(Method::POST, &format!("/{}/_close", self.index), None)
            .await?;

        let applied = self
            .transport
            .send(
                Method::PUT,
                &format!("/{}/_settings", self.index),
                Some(settings),
            )
            .await;
        let reopened = self
            .transport
            .send(Method::POST, &format!("/{}/_open", self.index), None)
            .await;

        applied?;
        reopened?;

        tracing::debug!(index = %self.index, "settings applied");
        Ok(())
    }
}
