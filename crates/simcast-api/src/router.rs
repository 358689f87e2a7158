//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`] with
//! CORS and HTTP tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the router with CORS open to any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_origins(state, &[])
}

/// Build the complete router.
///
/// An empty `cors_origins` allows any origin. Origins that are not valid
/// header values are skipped with a warning.
pub fn build_router_with_origins(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/results", get(ws::ws_results))
        // REST API
        .route("/api/scenarios", get(handlers::list_scenarios))
        .route("/api/scenarios/{id}", get(handlers::get_scenario))
        .route(
            "/api/scenarios/{id}/replications/{rep}/task-logs",
            get(handlers::get_task_logs),
        )
        .route("/api/results", get(handlers::list_results))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/tacts", get(handlers::list_tacts))
        .route("/api/simulations", post(handlers::start_simulation))
        .route("/api/notify-completion", post(handlers::notify_completion))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
