//! # Warren API Server
//!
//! ## Usage
//! ```bash
//! cargo run -p warren-api
//! WARREN_CONFIG=./server.toml cargo run -p warren-api
//! WARREN_PORT=8080 WARREN_ADMIN_TOKEN=s3cret cargo run -p warren-api
//! ```

use anyhow::Context;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use warren_api::{AppState, ServerConfig};
use warren_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,warren=debug,sqlx=warn,tower_http=debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warren API v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os("WARREN_CONFIG").map(PathBuf::from);
    let config = ServerConfig::load(config_path).context("Failed to load configuration")?;

    if let Some(parent) = config.storage.database_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::create_dir_all(&config.storage.uploads_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create uploads dir {}",
                config.storage.uploads_dir.display()
            )
        })?;

    info!(path = %config.storage.database_path.display(), "Opening database");
    let db = Database::new(DbConfig::new(&config.storage.database_path))
        .await
        .context("Failed to open database")?;

    if config.admin.token.is_none() {
        warn!("No admin token configured; /api/admin is open");
    }

    let addr = config.listen_addr();
    let state = AppState::new(config, db.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Warren API listening");

    axum::serve(listener, warren_api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
