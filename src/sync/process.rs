//! External bootstrap and daemon process handling for the sidecar.

use crate::config::SidecarConfig;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// A validated replication request.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub schema: Value,
}

/// Sidecar environment variables forwarded verbatim to the bootstrap and
/// daemon processes.
const FORWARDED_ENV: &[&str] = &[
    "LOG_LEVEL",
    "ELASTICSEARCH_HOST",
    "ELASTICSEARCH_PORT",
    "ELASTICSEARCH_USER",
    "ELASTICSEARCH_PASSWORD",
    "ELASTICSEARCH_SCHEME",
    "ELASTICSEARCH_USE_SSL",
    "ELASTICSEARCH_VERIFY_CERTS",
    "REDIS_HOST",
    "REDIS_PORT",
    "REDIS_AUTH",
    "ELASTICSEARCH",
    "OPENSEARCH",
];

/// Run the one-shot bootstrap for `job`, then start the sync daemon.
///
/// The schema is handed to both processes through a file that outlives this
/// call; the daemon reads it for as long as it runs. A non-zero bootstrap
/// exit aborts before the daemon starts and surfaces the process stderr.
pub async fn run(config: &SidecarConfig, job: &SyncJob) -> anyhow::Result<()> {
    let schema_file = tempfile::Builder::new()
        .prefix("retake-schema-")
        .suffix(".json")
        .tempfile()?;
    let (_, schema_path) = schema_file.keep()?;
    tokio::fs::write(&schema_path, serde_json::to_vec(&job.schema)?).await?;

    let env = job_env(job);

    let output = Command::new(&config.bootstrap_bin)
        .arg("--config")
        .arg(&schema_path)
        .envs(env.clone())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    tracing::info!(stdout = %String::from_utf8_lossy(&output.stdout), "bootstrap finished");

    if !output.status.success() {
        anyhow::bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
    }

    spawn_daemon(&config.daemon_bin, &schema_path, env)?;
    Ok(())
}

/// Start the long-running daemon, detached: it outlives the request and the
/// sidecar does not supervise it.
fn spawn_daemon(
    daemon_bin: &str,
    schema_path: &Path,
    env: Vec<(String, String)>,
) -> anyhow::Result<()> {
    Command::new(daemon_bin)
        .arg("--config")
        .arg(schema_path)
        .arg("--daemon")
        .envs(env)
        .spawn()?;

    tracing::info!(daemon = daemon_bin, "sync daemon started");
    Ok(())
}

fn job_env(job: &SyncJob) -> Vec<(String, String)> {
    let mut env = vec![
        ("PG_HOST".to_string(), job.host.clone()),
        ("PG_PORT".to_string(), job.port.clone()),
        ("PG_USER".to_string(), job.user.clone()),
        ("PG_PASSWORD".to_string(), job.password.clone()),
    ];
    for name in FORWARDED_ENV {
        if let Ok(value) = std::env::var(name) {
            env.push((name.to_string(), value));
        }
    }
    env
}
