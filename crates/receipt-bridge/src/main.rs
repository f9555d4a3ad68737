use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infrastructure::config::BridgeConfig;
use receipt_bridge::{api, build_print_service, state::AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override listen host
    #[arg(long)]
    host: Option<String>,

    /// Override listen port
    #[arg(long)]
    port: Option<u16>,
}

/// How often expired rate-limit windows are dropped
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,receipt_bridge=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("🧾 Receipt Bridge Starting...");
    info!("📂 Config directory: {}", args.config_dir);

    // 1. Load Configuration
    let mut config = BridgeConfig::load(&args.config_dir).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 2. Build the print pipeline (no device I/O until the first job)
    let service = Arc::new(build_print_service(&config).context("Invalid printer configuration")?);
    info!(
        kind = %config.printer.kind,
        vendor_id = ?config.printer.vendor_id,
        product_id = ?config.printer.product_id,
        paper_width = config.printer.paper_width,
        "✅ Printer configured"
    );
    if config.server.api_key.is_none() {
        info!("API key not set, /api is open");
    }

    // 3. Start API Server
    let state = Arc::new(AppState::new(service.clone(), &config.server, &config.printer.kind));
    let cancel = CancellationToken::new();
    let cleanup = state
        .rate_limiter
        .spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL, cancel.clone());

    let app = api::create_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("🚀 API Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // 4. Shutdown
    cancel.cancel();
    if let Err(e) = cleanup.await {
        error!("Rate limiter cleanup task failed: {}", e);
    }
    info!("Closing printer connection...");
    service
        .close_gracefully(config.print.shutdown_timeout())
        .await;
    info!("👋 Receipt Bridge stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("🛑 Shutdown signal received");
}
