//! # Stockbridge Sync API
//!
//! Server binary: loads configuration, connects to Postgres, wires the ERP
//! client into the sync engine and serves the routes.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  .env ──► tracing ──► ServerConfig ──► BridgeConfig ──► Database       │
//! │                                                             │           │
//! │            ErpClient ──► SyncOrchestrator + WebhookReceiver │           │
//! │                                  │                          │           │
//! │                                  ▼                          ▼           │
//! │                           axum Router  ──► serve until SIGINT/SIGTERM  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stockbridge_db::{Database, DbConfig, SyncLogStore};
use stockbridge_sync::{BridgeConfig, ErpClient, ProductSource, SyncOrchestrator, WebhookReceiver};
use stockbridge_sync_api::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stockbridge=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Stockbridge sync API...");

    // Configuration
    let server = ServerConfig::from_env().context("invalid server configuration")?;
    let bridge = BridgeConfig::load(server.bridge_config_path.as_deref())
        .context("invalid bridge configuration")?;
    info!(
        host = %server.host,
        port = server.port,
        erp = %bridge.erp.base_url,
        full_mode = %bridge.sync.full_mode,
        "Configuration loaded"
    );

    // Database
    let db_config = DbConfig::new(server.database_url.clone())
        .max_connections(server.db_max_connections)
        .run_migrations(server.run_migrations);
    let database = Database::new(db_config)
        .await
        .context("failed to connect to database")?;
    info!("Connected to PostgreSQL");

    // Sync engine
    let source: Arc<dyn ProductSource> =
        Arc::new(ErpClient::new(&bridge).context("failed to build ERP client")?);
    let catalog = Arc::new(database.catalog());
    let sync_logs: Arc<dyn SyncLogStore> = Arc::new(database.sync_logs());

    let orchestrator = SyncOrchestrator::new(
        source.clone(),
        catalog.clone(),
        sync_logs.clone(),
        bridge.sync.clone(),
    );
    let webhooks = WebhookReceiver::new(source, catalog, sync_logs.clone(), bridge.webhook.clone());

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        webhooks: Arc::new(webhooks),
        sync_logs,
        database: Some(database.clone()),
    };

    // Serve
    let addr = server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
