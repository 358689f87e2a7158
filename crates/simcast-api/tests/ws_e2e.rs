//! End-to-end `WebSocket` tests over a real TCP listener.
//!
//! Clients connect with `tokio-tungstenite`; notifications are triggered
//! through the same router the server uses.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::Value;
use simcast_api::{AppState, ConnectionRegistry, ProducerLauncher, ServerConfig, build_router, serve};
use simcast_db::{Store, seed};
use simcast_types::{NewSimulationResult, ScenarioId};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

async fn start() -> TestServer {
    let store = Store::memory();
    seed(&store).await.unwrap();

    let state = Arc::new(AppState::new(
        store,
        Arc::new(ConnectionRegistry::new(8, Duration::from_millis(500))),
        ProducerLauncher::new("simcast-test-missing-producer", Vec::new()),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server_state = Arc::clone(&state);
    let handle = tokio::spawn(async move {
        let config = ServerConfig::default();
        serve(listener, &config, server_state, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    TestServer {
        addr,
        state,
        shutdown: Some(tx),
        handle,
    }
}

impl TestServer {
    async fn connect(&self) -> Client {
        let (client, _) = connect_async(format!("ws://{}/ws/results", self.addr))
            .await
            .expect("WebSocket handshake");
        client
    }

    async fn wait_for_connections(&self, expected: usize) {
        tokio::time::timeout(WAIT, async {
            while self.state.registry.len().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("connections registered");
    }

    async fn post(&self, path: &str) -> StatusCode {
        build_router(Arc::clone(&self.state))
            .oneshot(Request::post(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    async fn results(&self) -> Value {
        let response = build_router(Arc::clone(&self.state))
            .oneshot(Request::get("/api/results").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn write_results(&self, scenario: i32, replications: i32) {
        for replication in 1..=replications {
            self.state
                .store
                .insert_result(&NewSimulationResult {
                    scenario_id: ScenarioId::new(scenario),
                    replication,
                    total_labor_costs: dec!(9500.00),
                    ontime_delivery_rate: dec!(0.8750),
                })
                .await
                .unwrap();
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("server stopped")
            .unwrap();
    }
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("frame before timeout")
            .expect("stream open")
            .expect("frame ok");
        match msg {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn every_client_receives_the_served_results() {
    let server = start().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(server.connect().await);
    }
    server.wait_for_connections(3).await;

    // Stand-in for a producer run: results for two of three scenarios.
    server.write_results(1, 3).await;
    server.write_results(2, 2).await;

    assert_eq!(server.post("/api/simulations").await, StatusCode::OK);
    assert_eq!(server.post("/api/notify-completion").await, StatusCode::OK);

    let served = server.results().await;
    for client in &mut clients {
        let pushed: Value = serde_json::from_str(&next_text(client).await).unwrap();
        assert_eq!(pushed.as_array().unwrap().len(), 2);
        assert_eq!(pushed, served);
    }

    server.stop().await;
}

#[tokio::test]
async fn disconnected_client_does_not_block_others() {
    let server = start().await;
    let mut staying = server.connect().await;
    let mut leaving = server.connect().await;
    server.wait_for_connections(2).await;

    leaving.close(None).await.unwrap();
    drop(leaving);
    server.wait_for_connections(1).await;

    server.write_results(1, 1).await;
    assert_eq!(server.post("/api/notify-completion").await, StatusCode::OK);

    let pushed: Value = serde_json::from_str(&next_text(&mut staying).await).unwrap();
    assert_eq!(pushed[0]["scenario_id"], 1);

    server.stop().await;
}

#[tokio::test]
async fn client_dropped_during_broadcasts_is_pruned() {
    let server = start().await;
    let mut staying = server.connect().await;
    let dropped = server.connect().await;
    server.wait_for_connections(2).await;
    server.write_results(1, 1).await;

    // No close handshake, and no waiting for the server to notice.
    drop(dropped);
    for _ in 0..3 {
        assert_eq!(server.post("/api/notify-completion").await, StatusCode::OK);
        let pushed: Value = serde_json::from_str(&next_text(&mut staying).await).unwrap();
        assert_eq!(pushed[0]["scenario_id"], 1);
    }

    server.wait_for_connections(1).await;
    server.stop().await;
}

#[tokio::test]
async fn inbound_messages_are_ignored() {
    let server = start().await;
    let mut client = server.connect().await;
    server.wait_for_connections(1).await;

    client.send(Message::Text("hello".into())).await.unwrap();
    client.send(Message::Ping(vec![1, 2, 3].into())).await.unwrap();

    assert_eq!(server.post("/api/notify-completion").await, StatusCode::OK);
    assert_eq!(next_text(&mut client).await, "[]");
    assert_eq!(server.state.registry.len().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = start().await;
    let mut client = server.connect().await;
    server.wait_for_connections(1).await;
    let state = Arc::clone(&server.state);

    server.stop().await;
    assert!(state.registry.is_empty().await);

    let ended = tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
