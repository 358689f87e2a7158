//! Shared type definitions for the Simcast scenario results service.
//!
//! This crate is the single source of truth for the entities stored in the
//! relational schema and the read models served over HTTP and pushed over
//! the `WebSocket`. Types flow downstream to `TypeScript` via `ts-rs` for
//! the results dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer key wrappers
//! - [`enums`] -- [`TaskState`] lifecycle transitions
//! - [`structs`] -- Entities, insert shapes, and read models

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{TaskState, UnknownTaskState};
pub use ids::{OperatorId, ScenarioId, SimulationResultId, TactId, TaskId, TaskLogId, WorkId};
pub use structs::{
    COST_SCALE, ChainLink, NewSimulationResult, NewTaskLog, Operator, ReplicationResult, Scenario,
    ScenarioDetail, ScenarioSummary, SimulationResult, Tact, Task, TaskLog, TaskLogDetail, Work,
    RATE_SCALE,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the dashboard.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are exported. Files land in `bindings/`
        // relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::ScenarioId::export_all();
        let _ = crate::ids::TaskLogId::export_all();
        let _ = crate::enums::TaskState::export_all();
        let _ = crate::structs::Scenario::export_all();
        let _ = crate::structs::ScenarioSummary::export_all();
        let _ = crate::structs::ScenarioDetail::export_all();
        let _ = crate::structs::TaskLogDetail::export_all();
        let _ = crate::structs::ChainLink::export_all();
    }
}
