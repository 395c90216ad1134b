//! Sync sidecar entry point.

use clap::Parser;
use retake::config::SidecarConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "retake-sidecar", about = "Replication sidecar for retake")]
struct Cli {
    /// Address to listen on (overrides SIDECAR_BIND_ADDR).
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = SidecarConfig::from_env()?;
    let bind: SocketAddr = match cli.bind {
        Some(bind) => bind,
        None => config.bind_addr.parse()?,
    };

    let app = retake::sync::router(Arc::new(config));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "sidecar listening");
    axum::serve(listener, app).await?;

    Ok(())
}
