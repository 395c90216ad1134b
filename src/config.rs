//! Environment-backed service configuration.

use crate::error::{ConfigError, Result};
use serde::Deserialize;

/// Gateway configuration, loaded from the process environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bearer token the gateway requires on every request.
    pub api_key: String,
    /// Base URL of the backend REST API.
    #[serde(default = "default_opensearch_url")]
    pub opensearch_url: String,
    pub opensearch_user: Option<String>,
    pub opensearch_password: Option<String>,
    /// Address the gateway listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_opensearch_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    /// Load from the environment, failing fast when a required property is
    /// absent.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(ConfigError::Load)?;
        Ok(settings.try_deserialize().map_err(ConfigError::Load)?)
    }
}

/// Sidecar configuration. Every property has a default, so loading never
/// blocks startup; override via `SIDECAR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SidecarConfig {
    /// Address the sidecar listens on.
    #[serde(default = "default_sidecar_bind_addr")]
    pub bind_addr: String,
    /// One-shot validation binary run before the daemon starts.
    #[serde(default = "default_bootstrap_bin")]
    pub bootstrap_bin: String,
    /// Long-running replication daemon binary.
    #[serde(default = "default_daemon_bin")]
    pub daemon_bin: String,
}

fn default_sidecar_bind_addr() -> String {
    "0.0.0.0:7433".to_string()
}

fn default_bootstrap_bin() -> String {
    "/usr/local/bin/bootstrap".to_string()
}

fn default_daemon_bin() -> String {
    "/usr/local/bin/pgsync".to_string()
}

impl SidecarConfig {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("SIDECAR"))
            .build()
            .map_err(ConfigError::Load)?;
        Ok(settings.try_deserialize().map_err(ConfigError::Load)?)
    }
}
