//! `WebSocket` handler for result notifications.
//!
//! Clients connect to `GET /ws/results` and receive one JSON text frame per
//! broadcast. Inbound text and binary frames are discarded; the socket is
//! read only to answer pings and notice disconnects.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and register it.
///
/// # Route
///
/// `GET /ws/results`
pub async fn ws_results(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Pump queued frames to the socket until either side goes away, then
/// unregister.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut rx) = state.registry.register().await;
    debug!(connection = %id, "WebSocket client connected");

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!(connection = %id, "Registry closed, ending WebSocket");
                    // Best effort; the peer may already be gone.
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                if socket.send(Message::Text(frame.as_ref().into())).await.is_err() {
                    debug!(connection = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection = %id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Keep-alive traffic from the client carries no protocol.
                    }
                }
            }
        }
    }

    state.registry.unregister(id).await;
}
