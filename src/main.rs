//! Install gateway binary.
//!
//! Loads `.env`, reads configuration from the environment, runs migrations
//! and serves the router until Ctrl+C or SIGTERM.

use anyhow::Context;
use chrono::Utc;
use shop_auth_gateway::logging::LoggingConfig;
use shop_auth_gateway::store::{self, SessionRepository};
use shop_auth_gateway::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    LoggingConfig::from_env()
        .init()
        .context("failed to initialize logging")?;

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let pool = store::create_pool(config.database_url(), config.max_connections())
        .await
        .context("failed to create database pool")?;
    store::migrate(&pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database ready");

    let purged = SessionRepository::new(&pool)
        .purge_expired(Utc::now())
        .await
        .context("failed to purge expired sessions")?;
    if purged > 0 {
        tracing::info!(purged, "Purged expired sessions");
    }

    let addr = config.bind_addr();
    let state = AppState::new(config, pool.clone()).context("failed to build HTTP client")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
