//! Error types for the result producer.
//!
//! Only setup failures abort the process. Per-row write failures and an
//! unreachable completion callback are logged where they happen.

/// Errors that can occur while running the producer.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] simcast_core::ConfigError),

    /// Connecting to or reading from the store failed.
    #[error("database error: {0}")]
    Database(#[from] simcast_db::DbError),

    /// The configured backend cannot be shared with the API process.
    #[error("the producer needs the postgres backend, got {0}")]
    Backend(String),

    /// The timeline start could not be parsed.
    #[error("timeline error: {0}")]
    Timeline(#[from] simcast_core::TimelineError),

    /// The completion callback could not be delivered.
    #[error("notification to {url} failed: {message}")]
    NotificationUnreachable {
        /// Callback URL.
        url: String,
        /// Transport error or unexpected status.
        message: String,
    },
}
