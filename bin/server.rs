// Tax Records - Web Server
// REST API with Axum over the shared SQLite store

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tax_records::api::{self, AppState, AuthSettings};
use tax_records::config::Config;
use tax_records::logging::{init_logging, Verbosity};
use tax_records::Store;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "tax-records-server", version, about = "Tax records HTTP API")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(Verbosity::from_occurrences(args.verbose));

    let config = Config::load_from(args.config.as_deref()).context("Failed to load configuration")?;

    let store = Store::open(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.storage.database_path.display()
        )
    })?;
    info!(path = %config.storage.database_path.display(), "database opened");

    if !config.auth.enabled {
        warn!("authentication disabled; record routes are open");
    }

    let state = AppState::new(store, AuthSettings::from_config(&config.auth));

    let mut app = api::router(state);
    if config.server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = args.bind.unwrap_or(config.server.bind_address);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(%addr, "server running; press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
