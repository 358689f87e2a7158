//! In-memory backend with the same observable semantics as `PostgreSQL`.
//!
//! Used by router tests and by single-process demos. Keys are assigned
//! from per-table counters starting at 1. Foreign keys and the
//! `(scenario_id, replication)` uniqueness rule are checked on write.

use std::collections::BTreeMap;
use std::sync::Arc;

use simcast_types::{
    NewSimulationResult, NewTaskLog, Operator, OperatorId, Scenario, ScenarioId, ScenarioSummary,
    SimulationResult, SimulationResultId, Tact, TactId, Task, TaskId, TaskLog, TaskLogDetail,
    TaskLogId, Work, WorkId,
};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::aggregate;
use crate::error::DbError;

/// Shared handle to the in-memory tables. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    seeding: Arc<Mutex<()>>,
}

#[derive(Debug, Default)]
struct Tables {
    scenarios: Vec<Scenario>,
    results: Vec<SimulationResult>,
    tasks: Vec<Task>,
    tacts: Vec<Tact>,
    works: Vec<Work>,
    operators: Vec<Operator>,
    task_logs: Vec<TaskLog>,
    keys: Keys,
}

#[derive(Debug, Default)]
struct Keys {
    scenario: i32,
    result: i32,
    task: i32,
    tact: i32,
    work: i32,
    operator: i32,
    task_log: i64,
}

fn next_i32(counter: &mut i32) -> Result<i32, DbError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| DbError::InvalidData(String::from("key space exhausted")))?;
    Ok(*counter)
}

fn next_i64(counter: &mut i64) -> Result<i64, DbError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| DbError::InvalidData(String::from("key space exhausted")))?;
    Ok(*counter)
}

impl Tables {
    fn has_scenario(&self, id: ScenarioId) -> bool {
        self.scenarios.iter().any(|s| s.scenario_id == id)
    }

    fn task_name(&self, id: TaskId) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.task_id == id)
            .map(|t| t.task_name.as_str())
    }

    fn tact_name(&self, id: TactId) -> Option<&str> {
        self.tacts
            .iter()
            .find(|t| t.tact_id == id)
            .map(|t| t.tact_name.as_str())
    }

    fn work_name(&self, id: WorkId) -> Option<&str> {
        self.works
            .iter()
            .find(|w| w.work_id == id)
            .map(|w| w.work_name.as_str())
    }

    fn operator_name(&self, id: OperatorId) -> Option<&str> {
        self.operators
            .iter()
            .find(|o| o.operator_id == id)
            .map(|o| o.operator_name.as_str())
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Held for the duration of a seed run.
    pub(crate) async fn seed_guard(&self) -> MutexGuard<'_, ()> {
        self.seeding.lock().await
    }

    /// Every scenario ordered by key.
    pub async fn list_scenarios(&self) -> Vec<Scenario> {
        let tables = self.tables.read().await;
        let mut rows = tables.scenarios.clone();
        rows.sort_by_key(|s| s.scenario_id);
        rows
    }

    /// One scenario, if present.
    pub async fn get_scenario(&self, scenario_id: ScenarioId) -> Option<Scenario> {
        let tables = self.tables.read().await;
        tables
            .scenarios
            .iter()
            .find(|s| s.scenario_id == scenario_id)
            .cloned()
    }

    /// Insert a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the key space is exhausted.
    pub async fn insert_scenario(
        &self,
        scenario_name: &str,
        description: Option<&str>,
    ) -> Result<ScenarioId, DbError> {
        let mut tables = self.tables.write().await;
        let scenario_id = ScenarioId::new(next_i32(&mut tables.keys.scenario)?);
        tables.scenarios.push(Scenario {
            scenario_id,
            scenario_name: scenario_name.to_owned(),
            description: description.map(str::to_owned),
        });
        Ok(scenario_id)
    }

    /// Insert a result row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ForeignKey`] for an unknown scenario or
    /// [`DbError::Duplicate`] for a repeated replication. Nothing is stored
    /// on error.
    pub async fn insert_result(
        &self,
        result: &NewSimulationResult,
    ) -> Result<SimulationResultId, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.has_scenario(result.scenario_id) {
            return Err(DbError::ForeignKey(format!(
                "scenario {} does not exist",
                result.scenario_id
            )));
        }
        if tables
            .results
            .iter()
            .any(|r| r.scenario_id == result.scenario_id && r.replication == result.replication)
        {
            return Err(DbError::Duplicate(format!(
                "scenario {} already has replication {}",
                result.scenario_id, result.replication
            )));
        }

        let sim_result_id = SimulationResultId::new(next_i32(&mut tables.keys.result)?);
        tables.results.push(SimulationResult {
            sim_result_id,
            scenario_id: result.scenario_id,
            replication: result.replication,
            total_labor_costs: result.total_labor_costs,
            ontime_delivery_rate: result.ontime_delivery_rate,
        });
        Ok(sim_result_id)
    }

    /// Every result row of one scenario, in insertion order.
    pub async fn results_for(&self, scenario_id: ScenarioId) -> Vec<SimulationResult> {
        let tables = self.tables.read().await;
        tables
            .results
            .iter()
            .filter(|r| r.scenario_id == scenario_id)
            .cloned()
            .collect()
    }

    /// Per-scenario averages for scenarios with at least one result.
    pub async fn summaries(&self) -> Vec<ScenarioSummary> {
        let tables = self.tables.read().await;

        let mut grouped: BTreeMap<ScenarioId, Vec<&SimulationResult>> = BTreeMap::new();
        for row in &tables.results {
            grouped.entry(row.scenario_id).or_default().push(row);
        }

        grouped
            .into_iter()
            .filter_map(|(scenario_id, rows)| {
                let scenario = tables
                    .scenarios
                    .iter()
                    .find(|s| s.scenario_id == scenario_id)?;
                let costs = aggregate::mean(rows.iter().map(|r| r.total_labor_costs))?;
                let rates = aggregate::mean(rows.iter().map(|r| r.ontime_delivery_rate))?;
                Some(aggregate::summary(
                    scenario_id,
                    scenario.scenario_name.clone(),
                    costs,
                    rates,
                ))
            })
            .collect()
    }

    /// Highest stored replication number of a scenario.
    pub async fn max_replication(&self, scenario_id: ScenarioId) -> Option<i32> {
        let tables = self.tables.read().await;
        tables
            .results
            .iter()
            .filter(|r| r.scenario_id == scenario_id)
            .map(|r| r.replication)
            .max()
    }

    /// Append a task log row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ForeignKey`] if any referenced row is missing.
    pub async fn insert_task_log(&self, log: &NewTaskLog) -> Result<TaskLogId, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.has_scenario(log.scenario_id) {
            return Err(DbError::ForeignKey(format!(
                "scenario {} does not exist",
                log.scenario_id
            )));
        }
        if tables.task_name(log.task_id).is_none() {
            return Err(DbError::ForeignKey(format!("task {} does not exist", log.task_id)));
        }
        if let Some(tact_id) = log.tact_id {
            if tables.tact_name(tact_id).is_none() {
                return Err(DbError::ForeignKey(format!("tact {tact_id} does not exist")));
            }
        }
        if tables.work_name(log.work_id).is_none() {
            return Err(DbError::ForeignKey(format!("work {} does not exist", log.work_id)));
        }
        if tables.operator_name(log.operator_id).is_none() {
            return Err(DbError::ForeignKey(format!(
                "operator {} does not exist",
                log.operator_id
            )));
        }

        let task_log_id = TaskLogId::new(next_i64(&mut tables.keys.task_log)?);
        tables.task_logs.push(TaskLog {
            task_log_id,
            scenario_id: log.scenario_id,
            replication: log.replication,
            time_stamp: log.time_stamp.clone(),
            task_id: log.task_id,
            tact_id: log.tact_id,
            work_id: log.work_id,
            operator_id: log.operator_id,
            state: log.state,
        });
        Ok(task_log_id)
    }

    /// Joined task log listing for one run, ordered by
    /// `(time_stamp, task_log_id)`.
    pub async fn task_logs(&self, scenario_id: ScenarioId, replication: i32) -> Vec<TaskLogDetail> {
        let tables = self.tables.read().await;

        let mut rows: Vec<&TaskLog> = tables
            .task_logs
            .iter()
            .filter(|l| l.scenario_id == scenario_id && l.replication == replication)
            .collect();
        rows.sort_by(|a, b| {
            a.time_stamp
                .cmp(&b.time_stamp)
                .then(a.task_log_id.cmp(&b.task_log_id))
        });

        // Inner joins: a row whose references vanished is dropped, as in SQL.
        rows.into_iter()
            .filter_map(|log| {
                Some(TaskLogDetail {
                    task_log_id: log.task_log_id,
                    scenario_id: log.scenario_id,
                    replication: log.replication,
                    time_stamp: log.time_stamp.clone(),
                    task_name: tables.task_name(log.task_id)?.to_owned(),
                    tact_name: log
                        .tact_id
                        .and_then(|id| tables.tact_name(id))
                        .map(str::to_owned),
                    work_name: tables.work_name(log.work_id)?.to_owned(),
                    operator_name: tables.operator_name(log.operator_id)?.to_owned(),
                    state: log.state,
                })
            })
            .collect()
    }

    /// All tasks ordered by key.
    pub async fn tasks(&self) -> Vec<Task> {
        let tables = self.tables.read().await;
        tables.tasks.clone()
    }

    /// All tacts ordered by key.
    pub async fn tacts(&self) -> Vec<Tact> {
        let tables = self.tables.read().await;
        tables.tacts.clone()
    }

    /// All works ordered by key.
    pub async fn works(&self) -> Vec<Work> {
        let tables = self.tables.read().await;
        tables.works.clone()
    }

    /// All operators ordered by key.
    pub async fn operators(&self) -> Vec<Operator> {
        let tables = self.tables.read().await;
        tables.operators.clone()
    }

    /// Insert an unlinked task.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the key space is exhausted.
    pub async fn insert_task(&self, task_name: &str) -> Result<TaskId, DbError> {
        let mut tables = self.tables.write().await;
        let task_id = TaskId::new(next_i32(&mut tables.keys.task)?);
        tables.tasks.push(Task {
            task_id,
            task_name: task_name.to_owned(),
            next_task_id: None,
        });
        Ok(task_id)
    }

    /// Point a task at its successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if `task_id` does not exist, or
    /// [`DbError::ForeignKey`] if `next` does not.
    pub async fn link_task(&self, task_id: TaskId, next: Option<TaskId>) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if let Some(next) = next {
            if tables.task_name(next).is_none() {
                return Err(DbError::ForeignKey(format!("task {next} does not exist")));
            }
        }
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| DbError::not_found("task", task_id))?;
        task.next_task_id = next;
        Ok(())
    }

    /// Insert an unlinked tact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the key space is exhausted.
    pub async fn insert_tact(&self, tact_name: &str) -> Result<TactId, DbError> {
        let mut tables = self.tables.write().await;
        let tact_id = TactId::new(next_i32(&mut tables.keys.tact)?);
        tables.tacts.push(Tact {
            tact_id,
            tact_name: tact_name.to_owned(),
            next_tact_id: None,
        });
        Ok(tact_id)
    }

    /// Point a tact at its successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if `tact_id` does not exist, or
    /// [`DbError::ForeignKey`] if `next` does not.
    pub async fn link_tact(&self, tact_id: TactId, next: Option<TactId>) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if let Some(next) = next {
            if tables.tact_name(next).is_none() {
                return Err(DbError::ForeignKey(format!("tact {next} does not exist")));
            }
        }
        let tact = tables
            .tacts
            .iter_mut()
            .find(|t| t.tact_id == tact_id)
            .ok_or_else(|| DbError::not_found("tact", tact_id))?;
        tact.next_tact_id = next;
        Ok(())
    }

    /// Insert a work label.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the key space is exhausted.
    pub async fn insert_work(&self, work_name: &str) -> Result<WorkId, DbError> {
        let mut tables = self.tables.write().await;
        let work_id = WorkId::new(next_i32(&mut tables.keys.work)?);
        tables.works.push(Work {
            work_id,
            work_name: work_name.to_owned(),
        });
        Ok(work_id)
    }

    /// Insert an operator.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the key space is exhausted.
    pub async fn insert_operator(&self, operator_name: &str) -> Result<OperatorId, DbError> {
        let mut tables = self.tables.write().await;
        let operator_id = OperatorId::new(next_i32(&mut tables.keys.operator)?);
        tables.operators.push(Operator {
            operator_id,
            operator_name: operator_name.to_owned(),
        });
        Ok(operator_id)
    }
}
