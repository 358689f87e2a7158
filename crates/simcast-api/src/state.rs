//! Shared application state for the API server.
//!
//! [`AppState`] is built once at startup, wrapped in an [`Arc`] and
//! injected via Axum's `State` extractor. It owns the connection registry,
//! so shutdown can close every `WebSocket` without any global state.

use std::sync::Arc;

use simcast_core::SimcastConfig;
use simcast_db::Store;

use crate::launcher::ProducerLauncher;
use crate::registry::ConnectionRegistry;

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// Query layer.
    pub store: Store,
    /// Open `/ws/results` connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Starts the result producer for `POST /api/simulations`.
    pub launcher: ProducerLauncher,
}

impl AppState {
    /// Assemble state from its parts.
    pub const fn new(
        store: Store,
        registry: Arc<ConnectionRegistry>,
        launcher: ProducerLauncher,
    ) -> Self {
        Self {
            store,
            registry,
            launcher,
        }
    }

    /// State wired from the loaded configuration.
    pub fn from_config(store: Store, config: &SimcastConfig) -> Self {
        Self::new(
            store,
            Arc::new(ConnectionRegistry::from_config(&config.broadcast)),
            ProducerLauncher::from_config(&config.producer),
        )
    }
}
