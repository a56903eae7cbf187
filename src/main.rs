//! Footy Exchange Backend Service
//!
//! Main entry point for the fantasy-football share market.
//! This service provides:
//! - HTTP JSON API for trading, players, portfolios and the leaderboard
//! - WebSocket price feed for real-time updates

use anyhow::Context;
use footy_exchange::config::{AppConfig, LogFormat, StorageBackend};
use footy_exchange::database::{create_pool, run_migrations};
use footy_exchange::repositories::{InMemoryMarketStore, MarketStore, PgMarketStore};
use footy_exchange::services::AuditTrailService;
use footy_exchange::{create_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "footy_exchange={level},footy_exchange_backend={level},sqlx=warn,tower_http=info",
            level = config.log_level
        )
        .into()
    });

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Configuration error")?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Footy Exchange Backend Starting                ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Storage backend: {}", config.storage.as_str());
    info!("HTTP port: {}", config.http_port);

    // =========================================================================
    // STORAGE SETUP
    // =========================================================================
    let store: Arc<dyn MarketStore> = match (&config.storage, &config.database) {
        (StorageBackend::Postgres, Some(db_config)) => {
            info!("Connecting to database...");
            let pool = create_pool(db_config)
                .await
                .context("Failed to create database pool")?;
            info!("Max connections: {}", db_config.max_connections);

            info!("Running database migrations...");
            run_migrations(&pool, None)
                .await
                .context("Database migration failed")?;
            info!("✓ Database ready");

            Arc::new(PgMarketStore::new(pool))
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("STORAGE_BACKEND=postgres requires database settings")
        }
        (StorageBackend::Memory, _) => {
            warn!("Using in-memory storage: market state is lost on shutdown");
            Arc::new(InMemoryMarketStore::new())
        }
    };

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    let audit = match &config.audit_log_dir {
        Some(dir) => {
            let audit = AuditTrailService::new(dir).context("Audit trail initialization failed")?;
            info!("✓ Audit trail writing to {:?}", audit.log_file());
            Some(Arc::new(audit))
        }
        None => None,
    };

    let http_port = config.http_port;
    let ws_port = config.ws_port;
    let state = AppState::new(config, store, audit);
    let feed = state.feed.clone();
    info!("✓ Trading services initialized");

    // =========================================================================
    // START SERVERS
    // =========================================================================
    let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", http_addr))?;

    let app = create_app(state);
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });
    info!("✓ HTTP API started on {}", http_addr);

    let ws_handle = match ws_port {
        Some(port) => {
            let ws_addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = TcpListener::bind(ws_addr)
                .await
                .with_context(|| format!("Failed to bind WebSocket server on {}", ws_addr))?;

            let handle = tokio::spawn(async move {
                if let Err(e) = feed.serve(listener).await {
                    error!("WebSocket server error: {}", e);
                }
            });
            info!("✓ WebSocket price feed started on {}", ws_addr);
            Some(handle)
        }
        None => {
            warn!("WS_PORT not configured - price feed not started");
            None
        }
    };

    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = http_handle => {
            error!("HTTP server exited unexpectedly");
        }
        _ = async {
            if let Some(handle) = ws_handle {
                handle.await.ok();
            } else {
                // Never completes if the price feed is not running
                futures::future::pending::<()>().await;
            }
        } => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    info!("Footy Exchange backend shutdown complete");
    Ok(())
}
