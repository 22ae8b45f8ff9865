// Sales Dashboard - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use sales_dashboard::api::{create_app, AppState};
use sales_dashboard::{Config, Dataset, SqliteStore};

#[derive(Parser)]
#[command(name = "sales-server")]
#[command(about = "HTTP API for monthly sales statistics and charts")]
struct Cli {
    #[arg(short, long, env = "SALES_CONFIG", help = "Path to configuration file")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .init();

    info!(version = sales_dashboard::VERSION, "Starting sales dashboard server");

    let store = SqliteStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    let dataset = Dataset::with_read_timeout(Arc::new(store), config.read_timeout());
    let state = AppState::new(dataset, config.seed_source(), config.seed_timeout());

    let app = create_app(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Server listening on http://{}", addr);
    info!("API: http://{}/api/transactions", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // keep serving without a shutdown hook
        std::future::pending::<()>().await;
    }
    info!("Graceful shutdown initiated");
}
