//! Breakglass Server: runs the impersonation expiry sweep.
//!
//! Loads configuration, connects to PostgreSQL, applies migrations when
//! configured to, then runs the sweeper until Ctrl+C or SIGTERM.

use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use breakglass_core::config::AppConfig;
use breakglass_core::error::AppError;
use breakglass_database::DatabasePool;
use breakglass_service::ImpersonationService;
use breakglass_worker::ExpirySweeper;

/// How long to wait for an in-flight sweep during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let env = std::env::var("BREAKGLASS_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().pretty().with_env_filter(filter).with_target(true).init();
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Breakglass");

    // ── Database connection + migrations ─────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        breakglass_database::migration::run_migrations(db.pool()).await?;
    }

    // ── Impersonation service ────────────────────────────────────
    let service = ImpersonationService::postgres(&config, &db);

    // ── Expiry sweeper ───────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_handle = if config.impersonation.auto_cleanup_enabled {
        let sweeper = ExpirySweeper::from_config(service);
        Some(tokio::spawn(async move {
            sweeper.run(shutdown_rx).await;
        }))
    } else {
        tracing::info!("Automatic expiry disabled; run `breakglass-cli sweep` on a schedule");
        None
    };

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping...");
    let _ = shutdown_tx.send(true);

    if let Some(handle) = sweeper_handle {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            tracing::warn!("Expiry sweeper did not stop within the grace period");
        }
    }

    db.close().await;
    tracing::info!("Breakglass shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
