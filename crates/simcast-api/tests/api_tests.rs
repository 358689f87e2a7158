//! Integration tests for the REST endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` against the
//! in-memory store, without starting a TCP server.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal_macros::dec;
use serde_json::Value;
use simcast_api::{AppState, ConnectionRegistry, ProducerLauncher, build_router};
use simcast_db::{Store, seed};
use simcast_types::{NewSimulationResult, NewTaskLog, ScenarioId, TaskState};
use tower::ServiceExt;

async fn make_test_state() -> Arc<AppState> {
    let store = Store::memory();
    seed(&store).await.unwrap();

    let results = [
        (1, 1, dec!(9000.00), dec!(0.8000)),
        (1, 2, dec!(11000.00), dec!(0.9000)),
        (2, 1, dec!(10500.25), dec!(0.8512)),
    ];
    for (scenario, replication, costs, rate) in results {
        store
            .insert_result(&NewSimulationResult {
                scenario_id: ScenarioId::new(scenario),
                replication,
                total_labor_costs: costs,
                ontime_delivery_rate: rate,
            })
            .await
            .unwrap();
    }

    let tasks = store.list_tasks().await.unwrap();
    let tacts = store.list_tacts().await.unwrap();
    let works = store.list_works().await.unwrap();
    let operators = store.list_operators().await.unwrap();
    let events = [
        ("2025-10-23_09:40:00", TaskState::End, None),
        ("2025-10-23_09:00:00", TaskState::Start, Some(tacts[0].tact_id)),
        ("2025-10-23_09:15:00", TaskState::Pause, None),
    ];
    for (time_stamp, state, tact_id) in events {
        store
            .insert_task_log(&NewTaskLog {
                scenario_id: ScenarioId::new(1),
                replication: 1,
                time_stamp: time_stamp.to_owned(),
                task_id: tasks[0].task_id,
                tact_id,
                work_id: works[0].work_id,
                operator_id: operators[0].operator_id,
                state,
            })
            .await
            .unwrap();
    }

    Arc::new(AppState::new(
        store,
        Arc::new(ConnectionRegistry::new(8, Duration::from_millis(200))),
        ProducerLauncher::new("simcast-test-missing-producer", Vec::new()),
    ))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(state: Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::post(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

#[tokio::test]
async fn test_index_reports_running() {
    let (status, json) = get(make_test_state().await, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Simulation Demo API is running");
}

#[tokio::test]
async fn test_list_scenarios() {
    let (status, json) = get(make_test_state().await, "/api/scenarios").await;
    assert_eq!(status, StatusCode::OK);

    let scenarios = json.as_array().unwrap();
    assert_eq!(scenarios.len(), 3);
    assert_eq!(scenarios[0]["scenario_id"], 1);
    assert_eq!(scenarios[0]["scenario_name"], "Status quo");
    assert!(scenarios[0]["description"].is_string());
}

#[tokio::test]
async fn test_get_scenario_detail() {
    let (status, json) = get(make_test_state().await, "/api/scenarios/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scenario_id"], 1);
    assert_eq!(json["replications"].as_array().unwrap().len(), 2);
    assert!(json["replications"][0]["total_labor_costs"].is_number());
}

#[tokio::test]
async fn test_get_scenario_without_results_has_no_replications() {
    let (status, json) = get(make_test_state().await, "/api/scenarios/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["replications"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_get_scenario_not_found() {
    let (status, json) = get(make_test_state().await, "/api/scenarios/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_get_scenario_malformed_id() {
    let response = build_router(make_test_state().await)
        .oneshot(
            Request::get("/api/scenarios/not-a-number")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_omit_scenarios_without_rows() {
    let (status, json) = get(make_test_state().await, "/api/results").await;
    assert_eq!(status, StatusCode::OK);

    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["scenario_id"], 1);
    let costs = results[0]["average_total_costs"].as_f64().unwrap();
    let rate = results[0]["average_delivery_rate"].as_f64().unwrap();
    assert!((costs - 10000.0).abs() < 1e-9);
    assert!((rate - 0.85).abs() < 1e-9);
    assert_eq!(results[1]["scenario_id"], 2);
}

#[tokio::test]
async fn test_task_logs_are_time_ordered() {
    let (status, json) = get(
        make_test_state().await,
        "/api/scenarios/1/replications/1/task-logs",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let logs = json.as_array().unwrap();
    let stamps: Vec<&str> = logs
        .iter()
        .map(|l| l["time_stamp"].as_str().unwrap())
        .collect();
    assert_eq!(
        stamps,
        vec![
            "2025-10-23_09:00:00",
            "2025-10-23_09:15:00",
            "2025-10-23_09:40:00"
        ]
    );
    assert_eq!(logs[0]["state"], "start");
    assert!(logs[0]["tact_name"].is_string());
    assert!(logs[1]["tact_name"].is_null());
    assert_eq!(logs[0]["task_name"], "Receiving");
    assert_eq!(logs[0]["operator_name"], "Operator A");
}

#[tokio::test]
async fn test_task_logs_for_unknown_run_are_empty() {
    let (status, json) = get(
        make_test_state().await,
        "/api/scenarios/1/replications/42/task-logs",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_task_chain_is_ordered() {
    let (status, json) = get(make_test_state().await, "/api/tasks").await;
    assert_eq!(status, StatusCode::OK);

    let chains = json.as_array().unwrap();
    assert_eq!(chains.len(), 1);
    let names: Vec<&str> = chains[0]
        .as_array()
        .unwrap()
        .iter()
        .map(|link| link["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, simcast_db::seed::TASKS.to_vec());
}

#[tokio::test]
async fn test_tact_chain_is_ordered() {
    let (status, json) = get(make_test_state().await, "/api/tacts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0][0]["name"], "Tact 1");
    assert_eq!(json[0].as_array().unwrap().len(), simcast_db::seed::TACTS.len());
}

#[tokio::test]
async fn test_cyclic_task_chain_is_integrity_error() {
    let state = make_test_state().await;
    let tasks = state.store.list_tasks().await.unwrap();
    let last = tasks.last().unwrap().task_id;
    let first = tasks.first().unwrap().task_id;
    state.store.link_task(last, Some(first)).await.unwrap();

    let (status, json) = get(state, "/api/tasks").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], 500);
}

#[tokio::test]
async fn test_start_simulation_returns_immediately_even_if_launch_fails() {
    let (status, json) = post(make_test_state().await, "/api/simulations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Simulation started.");
}

#[tokio::test]
async fn test_notify_completion_pushes_results_to_subscribers() {
    let state = make_test_state().await;
    let (_id, mut rx) = state.registry.register().await;

    let (status, json) = post(Arc::clone(&state), "/api/notify-completion").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Notification sent.");

    let frame = rx.recv().await.unwrap();
    let pushed: Value = serde_json::from_str(&frame).unwrap();
    let (_, served) = get(state, "/api/results").await;
    assert_eq!(pushed, served);
}

#[tokio::test]
async fn test_notify_completion_without_subscribers() {
    let (status, json) = post(make_test_state().await, "/api/notify-completion").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Notification sent.");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = build_router(make_test_state().await)
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
