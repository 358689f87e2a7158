//! Completion callback to the API process.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::ProducerError;

/// Posts the completion notification.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    url: String,
}

impl Notifier {
    /// Build a notifier whose request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::NotificationUnreachable`] if the HTTP client
    /// cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProducerError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProducerError::NotificationUnreachable {
                url: url.clone(),
                message: format!("client setup failed: {e}"),
            })?;
        Ok(Self { client, url })
    }

    /// Send one `POST`. No retry.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::NotificationUnreachable`] on a transport
    /// failure, a timeout, or a non-2xx status.
    pub async fn notify(&self) -> Result<(), ProducerError> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| self.unreachable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unreachable(format!("API returned {status}")));
        }

        info!(url = %self.url, %status, "Completion notification delivered");
        Ok(())
    }

    fn unreachable(&self, message: String) -> ProducerError {
        ProducerError::NotificationUnreachable {
            url: self.url.clone(),
            message,
        }
    }
}

/// Build a client and post the completion notification once.
///
/// Never fails: a client that cannot be built, a transport error, or a
/// non-2xx status is logged and reported as `false`.
pub async fn notify_completion(url: &str, timeout: Duration) -> bool {
    let delivered = match Notifier::new(url, timeout) {
        Ok(notifier) => notifier.notify().await,
        Err(e) => Err(e),
    };

    match delivered {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Completion notification not delivered");
            false
        }
    }
}
