//! Registry of open `WebSocket` connections.
//!
//! Each connection is represented by the sending half of a bounded queue;
//! its `WebSocket` task owns the receiving half and writes every frame it
//! pulls to the socket, so frames reach one client in send order.
//!
//! The map is guarded by a [`RwLock`]. [`ConnectionRegistry::broadcast`]
//! copies the senders out under the read lock and sends with the lock
//! released, so a slow client never blocks registration. Connections
//! whose queue is closed or stays full past the send timeout are
//! unregistered after the fan-out. Unregistering is idempotent, so a
//! handler exiting at the same moment is harmless.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use simcast_core::config::BroadcastConfig;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One encoded frame, shared by every queue it is pushed to.
pub type Frame = Arc<str>;

/// Identity of one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections that failed and were unregistered.
    pub failed: usize,
}

/// The set of open connections, owned by the application state.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<Frame>>>,
    capacity: usize,
    send_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create an empty registry. `capacity` is the per-connection queue
    /// length and is raised to 1 if zero.
    pub fn new(capacity: usize, send_timeout: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            send_timeout,
        }
    }

    /// Create a registry from the `broadcast` config section.
    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self::new(
            config.channel_capacity,
            Duration::from_millis(config.send_timeout_ms),
        )
    }

    /// Add a connection. The caller drains the returned receiver.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = ConnectionId::new();

        let mut connections = self.connections.write().await;
        connections.insert(id, tx);
        debug!(connection = %id, open = connections.len(), "Connection registered");

        (id, rx)
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            debug!(connection = %id, open = connections.len(), "Connection unregistered");
        }
        removed
    }

    /// Number of open connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no connection is open.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Queue `frame` for every open connection.
    ///
    /// Never fails as a whole: each connection that cannot take the frame
    /// is logged, counted in [`BroadcastReport::failed`] and removed.
    pub async fn broadcast(&self, frame: Frame) -> BroadcastReport {
        let targets: Vec<(ConnectionId, mpsc::Sender<Frame>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.send_timeout(Arc::clone(&frame), self.send_timeout).await {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(e) => {
                    warn!(connection = %id, error = %e, "Delivery failed, dropping connection");
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.unregister(id).await;
            report.failed = report.failed.saturating_add(1);
        }

        report
    }

    /// Drop every connection. Each handler sees its queue close and ends
    /// the socket with a close frame.
    pub async fn close_all(&self) -> usize {
        let mut connections = self.connections.write().await;
        let closed = connections.len();
        connections.clear();
        if closed > 0 {
            info!(closed, "Closed all WebSocket connections");
        }
        closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(4, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn every_connection_gets_the_same_frame() {
        let registry = registry();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            receivers.push(registry.register().await.1);
        }

        let report = registry.broadcast(Frame::from("[1,2]")).await;
        assert_eq!(report, BroadcastReport { delivered: 5, failed: 0 });

        for rx in &mut receivers {
            assert_eq!(rx.recv().await.as_deref(), Some("[1,2]"));
        }
    }

    #[tokio::test]
    async fn broken_connection_does_not_block_the_rest() {
        let registry = registry();
        let mut receivers = Vec::new();
        for _ in 0..4 {
            receivers.push(registry.register().await);
        }
        let (broken_id, broken_rx) = receivers.remove(2);
        drop(broken_rx);

        let report = registry.broadcast(Frame::from("[]")).await;
        assert_eq!(report, BroadcastReport { delivered: 3, failed: 1 });
        assert_eq!(registry.len().await, 3);
        assert!(!registry.unregister(broken_id).await);

        for (_, rx) in &mut receivers {
            assert_eq!(rx.recv().await.as_deref(), Some("[]"));
        }
    }

    #[tokio::test]
    async fn full_queue_times_out_and_is_dropped() {
        let registry = ConnectionRegistry::new(1, Duration::from_millis(20));
        let (_id, _rx) = registry.register().await;

        let first = registry.broadcast(Frame::from("a")).await;
        assert_eq!(first.delivered, 1);

        let second = registry.broadcast(Frame::from("b")).await;
        assert_eq!(second, BroadcastReport { delivered: 0, failed: 1 });
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn frames_arrive_in_send_order() {
        let registry = registry();
        let (_id, mut rx) = registry.register().await;

        for frame in ["1", "2", "3"] {
            registry.broadcast(Frame::from(frame)).await;
        }
        for expected in ["1", "2", "3"] {
            assert_eq!(rx.recv().await.as_deref(), Some(expected));
        }
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = registry();
        let (id, _rx) = registry.register().await;
        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_with_no_connections_is_a_noop() {
        let report = registry().broadcast(Frame::from("[]")).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn close_all_ends_every_queue() {
        let registry = registry();
        let (_a, mut rx_a) = registry.register().await;
        let (_b, mut rx_b) = registry.register().await;

        assert_eq!(registry.close_all().await, 2);
        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_registration_and_broadcast() {
        let registry = Arc::new(registry());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (id, rx) = registry.register().await;
                registry.broadcast(Frame::from("x")).await;
                registry.unregister(id).await;
                drop(rx);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(registry.is_empty().await);
    }
}
