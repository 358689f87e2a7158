//! Result producer for the Simcast scenario results service.
//!
//! Runs as a separate process, launched by `POST /api/simulations`. For
//! each configured scenario it samples and stores one result row per
//! replication (plus a synthetic task timeline), pausing between
//! replications to imitate work, then calls the API's completion endpoint
//! so connected dashboards receive the new averages.
//!
//! The process exits 0 once the run finishes, whether or not the callback
//! was delivered.

mod error;
mod notify;
mod runner;

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use simcast_core::SimcastConfig;
use simcast_core::config::{LogFormat, LoggingConfig, StorageBackend};
use simcast_db::{PostgresConfig, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ProducerError;
use crate::notify::notify_completion;
use crate::runner::Producer;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration or the database connection fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SimcastConfig::load()?;
    init_tracing(&config.logging);

    info!(
        scenarios = ?config.producer.scenario_ids,
        replications = config.producer.replications,
        iteration_delay_ms = config.producer.iteration_delay_ms,
        "simcast-producer starting"
    );

    let store = open_store(&config).await?;
    let producer = Producer::new(store.clone(), &config.producer);
    let mut rng = StdRng::from_os_rng();
    let mut report = producer.run(&mut rng).await?;
    store.close().await;

    report.notified = notify_completion(
        &config.producer.notify_url,
        Duration::from_millis(config.producer.notify_timeout_ms),
    )
    .await;

    info!(
        results_written = report.results_written,
        results_failed = report.results_failed,
        logs_written = report.logs_written,
        notified = report.notified,
        url = %config.producer.notify_url,
        "simcast-producer finished"
    );
    Ok(())
}

async fn open_store(config: &SimcastConfig) -> Result<Store, ProducerError> {
    let db = &config.database;
    if db.backend != StorageBackend::Postgres {
        return Err(ProducerError::Backend(format!("{:?}", db.backend).to_lowercase()));
    }

    let pg = PostgresConfig {
        url: db.url.clone(),
        max_connections: 2,
        acquire_timeout: Duration::from_secs(db.connect_timeout_secs),
        idle_timeout: Duration::from_secs(db.idle_timeout_secs),
    };
    Ok(Store::connect(&pg).await?)
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
