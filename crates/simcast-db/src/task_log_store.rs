//! Task log operations on `PostgreSQL`.

use simcast_types::{NewTaskLog, ScenarioId, TaskLogDetail, TaskLogId, TaskState};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `task_logs` table.
pub struct TaskLogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TaskLogStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one event in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ForeignKey`] if a referenced row is missing, or
    /// [`DbError::Postgres`] for other failures.
    pub async fn insert(&self, log: &NewTaskLog) -> Result<TaskLogId, DbError> {
        let mut tx = self.pool.begin().await?;

        let row: (i64,) = sqlx::query_as(
            r"INSERT INTO task_logs (scenario_id, replication, time_stamp, task_id, tact_id, work_id, operator_id, state)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              RETURNING task_log_id",
        )
        .bind(log.scenario_id.into_inner())
        .bind(log.replication)
        .bind(&log.time_stamp)
        .bind(log.task_id.into_inner())
        .bind(log.tact_id.map(simcast_types::TactId::into_inner))
        .bind(log.work_id.into_inner())
        .bind(log.operator_id.into_inner())
        .bind(log.state.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from_write)?;

        tx.commit().await?;

        Ok(TaskLogId::new(row.0))
    }

    /// Every event of one run, joined with display names and ordered by
    /// timestamp. Ties keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if a stored state is unknown, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn details(
        &self,
        scenario_id: ScenarioId,
        replication: i32,
    ) -> Result<Vec<TaskLogDetail>, DbError> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r"SELECT l.task_log_id,
                     l.scenario_id,
                     l.replication,
                     l.time_stamp,
                     t.task_name,
                     c.tact_name,
                     w.work_name,
                     o.operator_name,
                     l.state
              FROM task_logs l
              JOIN tasks t ON t.task_id = l.task_id
              LEFT JOIN tacts c ON c.tact_id = l.tact_id
              JOIN works w ON w.work_id = l.work_id
              JOIN operators o ON o.operator_id = l.operator_id
              WHERE l.scenario_id = $1 AND l.replication = $2
              ORDER BY l.time_stamp, l.task_log_id",
        )
        .bind(scenario_id.into_inner())
        .bind(replication)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DetailRow::into_detail).collect()
    }
}

/// One joined row of the task log listing.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DetailRow {
    task_log_id: i64,
    scenario_id: i32,
    replication: i32,
    time_stamp: String,
    task_name: String,
    tact_name: Option<String>,
    work_name: String,
    operator_name: String,
    state: String,
}

impl DetailRow {
    fn into_detail(self) -> Result<TaskLogDetail, DbError> {
        let state: TaskState = self
            .state
            .parse()
            .map_err(|e: simcast_types::UnknownTaskState| DbError::InvalidData(e.to_string()))?;

        Ok(TaskLogDetail {
            task_log_id: TaskLogId::new(self.task_log_id),
            scenario_id: ScenarioId::new(self.scenario_id),
            replication: self.replication,
            time_stamp: self.time_stamp,
            task_name: self.task_name,
            tact_name: self.tact_name,
            work_name: self.work_name,
            operator_name: self.operator_name,
            state,
        })
    }
}
