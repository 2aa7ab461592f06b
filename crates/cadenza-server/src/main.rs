//! # Cadenza
//!
//! Resolves media URLs into direct audio URLs over HTTP, falling back across
//! quality tiers and providers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cadenza_server::{router, telemetry, AppState, Config};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "cadenza", version, about)]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long, env = "CADENZA_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides config and environment.
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides config and environment.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("reading environment overrides")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().context("validating configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    telemetry::init(config.server.log_filter.as_deref());
    info!("Starting Cadenza v{}", env!("CARGO_PKG_VERSION"));

    let engine = config
        .resolver
        .build_engine()
        .await
        .context("building resolution engine")?;
    if engine.registry().is_empty() {
        warn!("No providers are available; every request will fail");
    } else {
        info!(
            "Engine ready: {} providers, {:?} strategy, {:?}",
            engine.registry().len(),
            engine.strategy(),
            engine.retry_policy()
        );
    }

    let app = router(AppState::new(engine));

    let addr = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}:{}", addr.0, addr.1))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {err}");
    }
}
