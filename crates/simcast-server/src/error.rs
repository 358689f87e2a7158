//! Error types for the API server binary.

/// Top-level error for the API server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: simcast_core::ConfigError,
    },

    /// Connecting, migrating or seeding failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: simcast_db::DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: simcast_api::ServerError,
    },
}
