//! cookbook-feed - Recipe feed service
//!
//! Serves the recipe REST API under `/api/v1` and the live `new-recipe`
//! event stream.

use anyhow::{Context, Result};
use clap::Parser;
use cookbook_common::config::{load_optional_config, ConfigOverrides, ServiceConfig};
use cookbook_common::db::init_database;
use cookbook_feed::feed::ConnectionRegistry;
use cookbook_feed::store::SqliteRecipeStore;
use cookbook_feed::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments for cookbook-feed
#[derive(Parser, Debug)]
#[command(name = "cookbook-feed")]
#[command(about = "Recipe feed service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "COOKBOOK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "COOKBOOK_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "COOKBOOK_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// `memory` or a SQLite file path
    #[arg(long, env = "COOKBOOK_DATABASE_URL")]
    database_url: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "COOKBOOK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (file_config, config_warning) = load_optional_config(args.config.as_deref());
    let config = ServiceConfig::resolve(
        ConfigOverrides {
            root_folder: args.root_folder,
            bind_address: args.bind_address,
            port: args.port,
            database_url: args.database_url,
            log_level: args.log_level,
        },
        file_config,
    );

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cookbook-feed v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_address()
    );
    if let Some(warning) = config_warning {
        warn!("{}", warning);
    }
    info!("Root folder: {}", config.root_folder.display());

    let pool = init_database(&config.database)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteRecipeStore::new(pool));
    let registry = ConnectionRegistry::new(config.event_capacity);

    let state = AppState::new(store, registry).with_cors_origins(config.cors_origins.clone());
    let app = build_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("cookbook-feed listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
