//! API server entry point.

use clap::Parser;
use retake::api::{ApiState, start_http_server};
use retake::config::Config;
use retake::search::EmbeddingConfig;
use retake::transport::HttpTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "retake", about = "Neural search provisioning and query service")]
struct Cli {
    /// Address to listen on (overrides BIND_ADDR).
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let bind = match cli.bind {
        Some(bind) => bind,
        None => config.bind_addr.parse()?,
    };

    let mut transport = HttpTransport::new(&config.opensearch_url);
    if let (Some(user), Some(password)) = (&config.opensearch_user, &config.opensearch_password) {
        transport = transport.with_basic_auth(user, password);
    }

    let state = Arc::new(ApiState::new(
        Arc::new(transport),
        EmbeddingConfig::default(),
        &config.api_key,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = start_http_server(bind, state, shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    server.await?;

    Ok(())
}
