//! The query layer: one entry point over either backend.
//!
//! Every HTTP handler, the broadcast path, the seed routine and the
//! producer go through [`Store`]. Both variants return identical shapes
//! for identical data, so the summary pushed over `WebSocket` matches the
//! one served by `GET /api/results`.

use simcast_types::{
    NewSimulationResult, NewTaskLog, Operator, OperatorId, ReplicationResult, Scenario,
    ScenarioDetail, ScenarioId, ScenarioSummary, SimulationResultId, Tact, TactId, Task, TaskId,
    TaskLogDetail, TaskLogId, Work, WorkId,
};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::postgres::{PostgresConfig, PostgresPool};
use crate::reference_store::ReferenceStore;
use crate::scenario_store::ScenarioStore;
use crate::task_log_store::TaskLogStore;

/// Storage backend handle. Cheap to clone.
#[derive(Debug, Clone)]
pub enum Store {
    /// A pooled `PostgreSQL` database.
    Postgres(PostgresPool),
    /// Process-local tables.
    Memory(MemoryStore),
}

impl Store {
    /// Connect to `PostgreSQL`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the pool cannot be created.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DbError> {
        Ok(Self::Postgres(PostgresPool::connect(config).await?))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Short backend name for logs.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Apply pending migrations. A no-op for the memory backend.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => pg.run_migrations().await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        if let Self::Postgres(pg) = self {
            pg.close().await;
        }
    }

    // -----------------------------------------------------------------------
    // Scenarios and results
    // -----------------------------------------------------------------------

    /// Every scenario, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_scenarios(&self) -> Result<Vec<Scenario>, DbError> {
        match self {
            Self::Postgres(pg) => ScenarioStore::new(pg.pool()).list().await,
            Self::Memory(mem) => Ok(mem.list_scenarios().await),
        }
    }

    /// Averages per scenario, omitting scenarios with no results, ordered
    /// by scenario id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn scenario_summaries(&self) -> Result<Vec<ScenarioSummary>, DbError> {
        match self {
            Self::Postgres(pg) => ScenarioStore::new(pg.pool()).summaries().await,
            Self::Memory(mem) => Ok(mem.summaries().await),
        }
    }

    /// A scenario with all of its replication results.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the scenario does not exist.
    pub async fn scenario_detail(&self, scenario_id: ScenarioId) -> Result<ScenarioDetail, DbError> {
        let (scenario, results) = match self {
            Self::Postgres(pg) => {
                let store = ScenarioStore::new(pg.pool());
                let Some(scenario) = store.get(scenario_id).await? else {
                    return Err(DbError::not_found("scenario", scenario_id));
                };
                (scenario, store.results_for(scenario_id).await?)
            }
            Self::Memory(mem) => {
                let Some(scenario) = mem.get_scenario(scenario_id).await else {
                    return Err(DbError::not_found("scenario", scenario_id));
                };
                (scenario, mem.results_for(scenario_id).await)
            }
        };

        Ok(ScenarioDetail {
            scenario_id: scenario.scenario_id,
            scenario_name: scenario.scenario_name,
            replications: results.iter().map(ReplicationResult::from).collect(),
        })
    }

    /// Insert a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_scenario(
        &self,
        scenario_name: &str,
        description: Option<&str>,
    ) -> Result<ScenarioId, DbError> {
        match self {
            Self::Postgres(pg) => {
                ScenarioStore::new(pg.pool())
                    .insert(scenario_name, description)
                    .await
            }
            Self::Memory(mem) => mem.insert_scenario(scenario_name, description).await,
        }
    }

    /// Append one result row atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] for a repeated
    /// `(scenario_id, replication)`, [`DbError::ForeignKey`] for an unknown
    /// scenario, or [`DbError::Postgres`] for other failures.
    pub async fn insert_result(
        &self,
        result: &NewSimulationResult,
    ) -> Result<SimulationResultId, DbError> {
        match self {
            Self::Postgres(pg) => ScenarioStore::new(pg.pool()).insert_result(result).await,
            Self::Memory(mem) => mem.insert_result(result).await,
        }
    }

    /// The replication number a new run of `scenario_id` should start at:
    /// one past the highest stored, or 1.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the counter would overflow.
    pub async fn next_replication(&self, scenario_id: ScenarioId) -> Result<i32, DbError> {
        let max = match self {
            Self::Postgres(pg) => {
                ScenarioStore::new(pg.pool())
                    .max_replication(scenario_id)
                    .await?
            }
            Self::Memory(mem) => mem.max_replication(scenario_id).await,
        };

        max.unwrap_or(0).checked_add(1).ok_or_else(|| {
            DbError::InvalidData(format!("replication counter overflow for scenario {scenario_id}"))
        })
    }

    // -----------------------------------------------------------------------
    // Task logs
    // -----------------------------------------------------------------------

    /// Joined events of one run, ordered by timestamp. Empty when nothing
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn task_logs(
        &self,
        scenario_id: ScenarioId,
        replication: i32,
    ) -> Result<Vec<TaskLogDetail>, DbError> {
        match self {
            Self::Postgres(pg) => {
                TaskLogStore::new(pg.pool())
                    .details(scenario_id, replication)
                    .await
            }
            Self::Memory(mem) => Ok(mem.task_logs(scenario_id, replication).await),
        }
    }

    /// Append one event atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ForeignKey`] if a referenced row is missing.
    pub async fn insert_task_log(&self, log: &NewTaskLog) -> Result<TaskLogId, DbError> {
        match self {
            Self::Postgres(pg) => TaskLogStore::new(pg.pool()).insert(log).await,
            Self::Memory(mem) => mem.insert_task_log(log).await,
        }
    }

    // -----------------------------------------------------------------------
    // Reference data
    // -----------------------------------------------------------------------

    /// All tasks, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).tasks().await,
            Self::Memory(mem) => Ok(mem.tasks().await),
        }
    }

    /// All tacts, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_tacts(&self) -> Result<Vec<Tact>, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).tacts().await,
            Self::Memory(mem) => Ok(mem.tacts().await),
        }
    }

    /// All works, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_works(&self) -> Result<Vec<Work>, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).works().await,
            Self::Memory(mem) => Ok(mem.works().await),
        }
    }

    /// All operators, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend query fails.
    pub async fn list_operators(&self) -> Result<Vec<Operator>, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).operators().await,
            Self::Memory(mem) => Ok(mem.operators().await),
        }
    }

    /// Insert an unlinked task.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_task(&self, task_name: &str) -> Result<TaskId, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).insert_task(task_name).await,
            Self::Memory(mem) => mem.insert_task(task_name).await,
        }
    }

    /// Set or clear a task's successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::ForeignKey`] for unknown
    /// ids.
    pub async fn link_task(&self, task_id: TaskId, next: Option<TaskId>) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).link_task(task_id, next).await,
            Self::Memory(mem) => mem.link_task(task_id, next).await,
        }
    }

    /// Insert an unlinked tact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_tact(&self, tact_name: &str) -> Result<TactId, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).insert_tact(tact_name).await,
            Self::Memory(mem) => mem.insert_tact(tact_name).await,
        }
    }

    /// Set or clear a tact's successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::ForeignKey`] for unknown
    /// ids.
    pub async fn link_tact(&self, tact_id: TactId, next: Option<TactId>) -> Result<(), DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).link_tact(tact_id, next).await,
            Self::Memory(mem) => mem.link_tact(tact_id, next).await,
        }
    }

    /// Insert a work label.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_work(&self, work_name: &str) -> Result<WorkId, DbError> {
        match self {
            Self::Postgres(pg) => ReferenceStore::new(pg.pool()).insert_work(work_name).await,
            Self::Memory(mem) => mem.insert_work(work_name).await,
        }
    }

    /// Insert an operator.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_operator(&self, operator_name: &str) -> Result<OperatorId, DbError> {
        match self {
            Self::Postgres(pg) => {
                ReferenceStore::new(pg.pool())
                    .insert_operator(operator_name)
                    .await
            }
            Self::Memory(mem) => mem.insert_operator(operator_name).await,
        }
    }
}
