use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use chat_hub::HubActor;
use chat_server::config::{FileConfig, ServerConfig, load_config};
use chat_server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Single-room WebSocket chat server")]
struct Args {
    /// Directory containing chat.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the web server (overrides config, 0 for automatic)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory with the browser client (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let default_directive = if args.debug {
        "chat=debug,chat_server=debug,chat_hub=debug,tower_http=debug,info"
    } else {
        "chat=info,chat_server=info,chat_hub=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let mut file_config: FileConfig = load_config(&args.config_dir)
        .extract()
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        file_config.server.host = host;
    }
    if let Some(port) = args.port {
        file_config.server.port = port;
    }
    if let Some(dir) = args.static_dir {
        file_config.server.static_dir = Some(dir);
    }
    let config = ServerConfig::from_file(&file_config)?;

    let hub = HubActor::spawn(config.hub.clone()).context("Failed to start broadcast hub")?;
    let state = AppState::new(hub.clone());
    let app = create_router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    let actual_addr = listener.local_addr()?;

    info!("Chat server listening on http://{}", actual_addr);
    match &config.static_dir {
        Some(dir) => info!("Serving client from {}", dir.display()),
        None => info!("Serving built-in client at /"),
    }
    info!("Endpoints:");
    info!("  GET  /ws          - WebSocket chat session");
    info!("  GET  /api/history - Recent events");
    info!("  GET  /health      - Hub and connection health");
    info!("  GET  /metrics     - Server metrics");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal, cleaning up...");
    };

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error");

    if let Err(e) = hub.shutdown().await {
        warn!("Hub already stopped: {}", e);
    }

    info!("Shutdown complete");
    server_result
}
