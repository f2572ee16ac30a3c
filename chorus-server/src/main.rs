//! chorus-server - REST backend for the choir rehearsal planner
//!
//! Serves songs, tasks (with uploaded recordings) and rehearsals to the
//! frontend, backed by SQLite.

use anyhow::{Context, Result};
use chorus_server::config::{Args, ServerConfig};
use chorus_server::db::init_database;
use chorus_server::uploads::RecordingStore;
use chorus_server::{build_router, AppState};
use clap::Parser;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorus_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chorus-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ServerConfig::load(args).context("Failed to load configuration")?;

    info!("Database: {}", config.database_url);
    let pool = match init_database(&config.database_url).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    let recordings = RecordingStore::new(&config.uploads_dir);
    recordings
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create {}", config.uploads_dir.display()))?;
    info!("Uploads directory: {}", config.uploads_dir.display());

    let state = AppState::new(pool, recordings);
    let app = build_router(state, &config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("chorus-server listening on http://{}", addr);
    info!("Allowed origin: {}", config.allowed_origin);

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
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
