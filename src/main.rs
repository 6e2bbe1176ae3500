use anyhow::{Context, Result};
use clap::Parser;
use shotlens::app::AppState;
use shotlens::config::Config;
use shotlens::server;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "shotlens")]
#[command(about = "Serve the screenshot analysis API and front end")]
struct CliArgs {
    /// Address to bind (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Directory of static assets (overrides STATIC_DIR).
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("shotlens={level},tower_http={level}", level = log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = Config::from_env();

    init_tracing(
        config
            .as_ref()
            .map(|config| config.log_level.as_str())
            .unwrap_or("info"),
    );

    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(static_dir) = args.static_dir {
        config.static_dir = static_dir;
    }

    info!("Starting shotlens");

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_addr()))?;
    let state = Arc::new(AppState::from_config(&config).context("Failed to build application")?);

    if let Err(e) = server::serve(state, addr, config.max_body_bytes).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }

    info!("Server shut down");
    Ok(())
}
