//! API server binary for the Simcast scenario results service.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `simcast-config.yaml` (or `SIMCAST_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the store (`PostgreSQL` pool or in-memory tables)
//! 4. Apply migrations and seed data, if configured
//! 5. Serve HTTP + `WebSocket` until Ctrl-C or SIGTERM
//! 6. Close every `WebSocket` connection and drain the pool

mod error;

use std::sync::Arc;
use std::time::Duration;

use simcast_api::{AppState, ServerConfig};
use simcast_core::SimcastConfig;
use simcast_core::config::{DatabaseConfig, LogFormat, LoggingConfig, StorageBackend};
use simcast_db::{PostgresConfig, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Application entry point for the API server.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SimcastConfig::load()?;
    init_tracing(&config.logging);

    info!(
        backend = ?config.database.backend,
        port = config.server.port,
        producer = config.producer.program,
        "simcast-server starting"
    );

    run(config).await?;

    info!("simcast-server shutdown complete");
    Ok(())
}

async fn run(config: SimcastConfig) -> Result<(), StartupError> {
    let store = open_store(&config.database).await?;

    if config.database.run_migrations {
        store.run_migrations().await?;
        info!(backend = store.backend(), "Migrations applied");
    }
    if config.database.seed_on_startup {
        simcast_db::seed(&store).await?;
    }

    let state = Arc::new(AppState::from_config(store.clone(), &config));
    let server_config = ServerConfig::from(&config.server);

    let served = simcast_api::start_server(&server_config, state, shutdown_signal()).await;
    store.close().await;
    served?;

    Ok(())
}

async fn open_store(config: &DatabaseConfig) -> Result<Store, StartupError> {
    match config.backend {
        StorageBackend::Postgres => {
            let pg = PostgresConfig {
                url: config.url.clone(),
                max_connections: config.max_connections,
                acquire_timeout: Duration::from_secs(config.connect_timeout_secs),
                idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            };
            let store = Store::connect(&pg).await?;
            info!(max_connections = config.max_connections, "PostgreSQL pool ready");
            Ok(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory store; data is lost on exit and the producer cannot write to it");
            Ok(Store::memory())
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
