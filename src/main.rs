use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vbr_gateway::{app, config, is_production, state::AppState};

#[derive(Debug, Parser)]
#[command(name = "vbr-gateway", version, about = "Virtual Biospecimen Repository API gateway")]
struct Args {
    /// Port to listen on (overrides VBR_API_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Environment file loaded before configuration is read
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Must happen before the config singleton is first touched
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.validate()?;
    info!(
        "Starting VBR gateway in {:?} mode for tenant {}",
        config.environment, config.identity.tenant_id
    );
    if is_production!() && config.security.cors_origins.iter().any(|o| o == "*") {
        warn!("CORS allows any origin in production");
    }

    let port = config.api.port;
    let state = AppState::from_config(config).context("failed to initialise application state")?;
    let app = app::router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("VBR gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
