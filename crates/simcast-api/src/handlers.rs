//! REST API endpoint handlers.
//!
//! Every handler goes through the [`Store`](simcast_db::Store) in
//! [`AppState`]; nothing is cached between requests.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Liveness message |
//! | `GET` | `/api/scenarios` | List scenarios |
//! | `GET` | `/api/scenarios/{id}` | One scenario with its replications |
//! | `GET` | `/api/scenarios/{id}/replications/{rep}/task-logs` | Ordered task timeline |
//! | `GET` | `/api/results` | Per-scenario averages |
//! | `GET` | `/api/tasks` | Ordered task chains |
//! | `GET` | `/api/tacts` | Ordered tact chains |
//! | `POST` | `/api/simulations` | Launch the result producer |
//! | `POST` | `/api/notify-completion` | Broadcast current results |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use simcast_core::chain_links;
use simcast_types::{ChainLink, Scenario, ScenarioDetail, ScenarioId, ScenarioSummary, TaskLogDetail};
use tracing::{error, info};

use crate::broadcast;
use crate::error::ApiError;
use crate::state::AppState;

/// `{"message": ...}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human-readable status.
    pub message: &'static str,
}

impl MessageResponse {
    const fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// `GET /`
pub async fn index() -> Json<MessageResponse> {
    MessageResponse::new("Simulation Demo API is running")
}

/// `GET /api/scenarios`
pub async fn list_scenarios(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Scenario>>, ApiError> {
    Ok(Json(state.store.list_scenarios().await?))
}

/// `GET /api/scenarios/{id}` -- 404 if the scenario does not exist.
pub async fn get_scenario(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ScenarioDetail>, ApiError> {
    let detail = state.store.scenario_detail(ScenarioId::new(id)).await?;
    Ok(Json(detail))
}

/// `GET /api/scenarios/{id}/replications/{rep}/task-logs`
///
/// An unknown scenario or replication yields an empty list.
pub async fn get_task_logs(
    State(state): State<Arc<AppState>>,
    Path((id, replication)): Path<(i32, i32)>,
) -> Result<Json<Vec<TaskLogDetail>>, ApiError> {
    let logs = state
        .store
        .task_logs(ScenarioId::new(id), replication)
        .await?;
    Ok(Json(logs))
}

/// `GET /api/results`
pub async fn list_results(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScenarioSummary>>, ApiError> {
    Ok(Json(state.store.scenario_summaries().await?))
}

/// `GET /api/tasks`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Vec<ChainLink>>>, ApiError> {
    let tasks = state.store.list_tasks().await?;
    Ok(Json(chain_links(&tasks)?))
}

/// `GET /api/tacts`
pub async fn list_tacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Vec<ChainLink>>>, ApiError> {
    let tacts = state.store.list_tacts().await?;
    Ok(Json(chain_links(&tacts)?))
}

/// `POST /api/simulations`
///
/// Fire-and-forget: the response does not depend on whether the producer
/// could be started.
pub async fn start_simulation(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if let Err(e) = state.launcher.launch() {
        error!(error = %e, "Could not launch producer");
    }
    MessageResponse::new("Simulation started.")
}

/// `POST /api/notify-completion`
pub async fn notify_completion(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!("Completion notification received");
    broadcast::notify_results(&state.store, &state.registry).await?;
    Ok(MessageResponse::new("Notification sent."))
}
