//! Entity and read-model structs for the Simcast service.
//!
//! Entities mirror the relational tables one-to-one. Read models
//! (`ScenarioSummary`, `ScenarioDetail`, `TaskLogDetail`) are the shapes
//! returned by the query layer and serialized unchanged by both the HTTP
//! handlers and the `WebSocket` broadcast.
//!
//! Decimal fields serialize as JSON numbers, not strings, so dashboard
//! code can chart them directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TaskState;
use crate::ids::{
    OperatorId, ScenarioId, SimulationResultId, TactId, TaskId, TaskLogId, WorkId,
};

/// Decimal places of `total_labor_costs` (`NUMERIC(10, 2)`).
pub const COST_SCALE: u32 = 2;

/// Decimal places of `ontime_delivery_rate` (`NUMERIC(5, 4)`).
pub const RATE_SCALE: u32 = 4;

// ---------------------------------------------------------------------------
// Scenarios and results
// ---------------------------------------------------------------------------

/// A named configuration whose outcomes are simulated across replications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Scenario {
    /// Primary key.
    pub scenario_id: ScenarioId,
    /// Display name.
    pub scenario_name: String,
    /// Free-text description.
    pub description: Option<String>,
}

/// One replication outcome for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationResult {
    /// Primary key.
    pub sim_result_id: SimulationResultId,
    /// Owning scenario.
    pub scenario_id: ScenarioId,
    /// Replication number, unique within the scenario.
    pub replication: i32,
    /// Total labor costs, two decimal places.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub total_labor_costs: Decimal,
    /// On-time delivery rate, four decimal places (a fraction).
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub ontime_delivery_rate: Decimal,
}

/// Insert shape for [`SimulationResult`]; the key is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSimulationResult {
    /// Owning scenario.
    pub scenario_id: ScenarioId,
    /// Replication number.
    pub replication: i32,
    /// Total labor costs.
    pub total_labor_costs: Decimal,
    /// On-time delivery rate.
    pub ontime_delivery_rate: Decimal,
}

/// Per-scenario averages over every stored replication.
///
/// This is both the `GET /api/results` element and the element of the
/// array pushed to `/ws/results` subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScenarioSummary {
    /// Scenario key.
    pub scenario_id: ScenarioId,
    /// Scenario display name.
    pub scenario_name: String,
    /// Mean of `total_labor_costs`.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub average_total_costs: Decimal,
    /// Mean of `ontime_delivery_rate`.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub average_delivery_rate: Decimal,
}

/// One replication row inside a [`ScenarioDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReplicationResult {
    /// Replication number.
    pub replication: i32,
    /// Total labor costs.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub total_labor_costs: Decimal,
    /// On-time delivery rate.
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(as = "f64")]
    pub ontime_delivery_rate: Decimal,
}

impl From<&SimulationResult> for ReplicationResult {
    fn from(row: &SimulationResult) -> Self {
        Self {
            replication: row.replication,
            total_labor_costs: row.total_labor_costs,
            ontime_delivery_rate: row.ontime_delivery_rate,
        }
    }
}

/// A scenario together with all of its replication results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScenarioDetail {
    /// Scenario key.
    pub scenario_id: ScenarioId,
    /// Scenario display name.
    pub scenario_name: String,
    /// Every stored replication, in no particular order.
    pub replications: Vec<ReplicationResult>,
}

// ---------------------------------------------------------------------------
// Task timeline reference data
// ---------------------------------------------------------------------------

/// A task; `next_task_id` links tasks into an ordered chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Task {
    /// Primary key.
    pub task_id: TaskId,
    /// Display name.
    pub task_name: String,
    /// The task that follows this one, if any.
    pub next_task_id: Option<TaskId>,
}

/// A tact (work cycle or station); `next_tact_id` links tacts into a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tact {
    /// Primary key.
    pub tact_id: TactId,
    /// Display name.
    pub tact_name: String,
    /// The tact that follows this one, if any.
    pub next_tact_id: Option<TactId>,
}

/// A work-category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Work {
    /// Primary key.
    pub work_id: WorkId,
    /// Display name.
    pub work_name: String,
}

/// The actor performing a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Operator {
    /// Primary key.
    pub operator_id: OperatorId,
    /// Display name.
    pub operator_name: String,
}

/// One element of an ordered task or tact chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChainLink {
    /// Key of the task or tact.
    pub id: i32,
    /// Display name of the task or tact.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Task logs
// ---------------------------------------------------------------------------

/// An immutable task state-transition event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TaskLog {
    /// Primary key.
    pub task_log_id: TaskLogId,
    /// Scenario the run belongs to.
    pub scenario_id: ScenarioId,
    /// Replication the run belongs to.
    pub replication: i32,
    /// Sortable timestamp text (`YYYY-MM-DD_HH:MM:SS`).
    pub time_stamp: String,
    /// The task that changed state.
    pub task_id: TaskId,
    /// The tact cycle, when the task is tied to one.
    pub tact_id: Option<TactId>,
    /// Work category.
    pub work_id: WorkId,
    /// Performing operator.
    pub operator_id: OperatorId,
    /// The transition.
    pub state: TaskState,
}

/// Insert shape for [`TaskLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskLog {
    /// Scenario the run belongs to.
    pub scenario_id: ScenarioId,
    /// Replication the run belongs to.
    pub replication: i32,
    /// Sortable timestamp text.
    pub time_stamp: String,
    /// The task that changed state.
    pub task_id: TaskId,
    /// Optional tact cycle.
    pub tact_id: Option<TactId>,
    /// Work category.
    pub work_id: WorkId,
    /// Performing operator.
    pub operator_id: OperatorId,
    /// The transition.
    pub state: TaskState,
}

/// A task log row joined with the names of everything it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TaskLogDetail {
    /// Primary key of the log row.
    pub task_log_id: TaskLogId,
    /// Scenario key.
    pub scenario_id: ScenarioId,
    /// Replication number.
    pub replication: i32,
    /// Sortable timestamp text.
    pub time_stamp: String,
    /// Task name.
    pub task_name: String,
    /// Tact name, `null` when the event has no tact.
    pub tact_name: Option<String>,
    /// Work category name.
    pub work_name: String,
    /// Operator name.
    pub operator_name: String,
    /// The transition.
    pub state: TaskState,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn summary_decimals_serialize_as_numbers() {
        let summary = ScenarioSummary {
            scenario_id: ScenarioId::new(1),
            scenario_name: String::from("Status quo"),
            average_total_costs: dec!(10000.00),
            average_delivery_rate: dec!(0.8512),
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["scenario_id"], 1);
        assert!(value["average_total_costs"].is_number());
        assert!(value["average_delivery_rate"].is_number());
        assert!((value["average_delivery_rate"].as_f64().unwrap() - 0.8512).abs() < 1e-12);
    }

    #[test]
    fn detail_nests_replications() {
        let row = SimulationResult {
            sim_result_id: SimulationResultId::new(5),
            scenario_id: ScenarioId::new(2),
            replication: 3,
            total_labor_costs: dec!(9123.45),
            ontime_delivery_rate: dec!(0.9001),
        };
        let detail = ScenarioDetail {
            scenario_id: row.scenario_id,
            scenario_name: String::from("One extra worker"),
            replications: vec![ReplicationResult::from(&row)],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["replications"][0]["replication"], 3);
        assert!(value["replications"][0]["total_labor_costs"].is_number());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn task_log_detail_keeps_null_tact_name() {
        let detail = TaskLogDetail {
            task_log_id: TaskLogId::new(1),
            scenario_id: ScenarioId::new(1),
            replication: 1,
            time_stamp: String::from("2025-10-23_09:21:11"),
            task_name: String::from("Picking"),
            tact_name: None,
            work_name: String::from("Assembly"),
            operator_name: String::from("Operator A"),
            state: TaskState::Start,
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert!(value["tact_name"].is_null());
        assert_eq!(value["state"], "start");
    }
}
