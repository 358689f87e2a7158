//! Reference data for the task timeline: tasks, tacts, works, operators.
//!
//! Chains are inserted unlinked and linked afterwards, since a row can only
//! point at a successor that already exists.

use simcast_types::{Operator, OperatorId, Tact, TactId, Task, TaskId, Work, WorkId};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `tasks`, `tacts`, `works` and `operators` tables.
pub struct ReferenceStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ReferenceStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All tasks ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn tasks(&self) -> Result<Vec<Task>, DbError> {
        let rows: Vec<(i32, String, Option<i32>)> = sqlx::query_as(
            r"SELECT task_id, task_name, next_task_id FROM tasks ORDER BY task_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, next)| Task {
                task_id: TaskId::new(id),
                task_name: name,
                next_task_id: next.map(TaskId::new),
            })
            .collect())
    }

    /// All tacts ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn tacts(&self) -> Result<Vec<Tact>, DbError> {
        let rows: Vec<(i32, String, Option<i32>)> = sqlx::query_as(
            r"SELECT tact_id, tact_name, next_tact_id FROM tacts ORDER BY tact_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, next)| Tact {
                tact_id: TactId::new(id),
                tact_name: name,
                next_tact_id: next.map(TactId::new),
            })
            .collect())
    }

    /// All works ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn works(&self) -> Result<Vec<Work>, DbError> {
        let rows: Vec<(i32, String)> =
            sqlx::query_as(r"SELECT work_id, work_name FROM works ORDER BY work_id")
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Work {
                work_id: WorkId::new(id),
                work_name: name,
            })
            .collect())
    }

    /// All operators ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn operators(&self) -> Result<Vec<Operator>, DbError> {
        let rows: Vec<(i32, String)> = sqlx::query_as(
            r"SELECT operator_id, operator_name FROM operators ORDER BY operator_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Operator {
                operator_id: OperatorId::new(id),
                operator_name: name,
            })
            .collect())
    }

    /// Insert an unlinked task.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_task(&self, task_name: &str) -> Result<TaskId, DbError> {
        self.insert_named(r"INSERT INTO tasks (task_name) VALUES ($1) RETURNING task_id", task_name)
            .await
            .map(TaskId::new)
    }

    /// Point a task at its successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if `task_id` does not exist, or
    /// [`DbError::ForeignKey`] if `next` does not.
    pub async fn link_task(&self, task_id: TaskId, next: Option<TaskId>) -> Result<(), DbError> {
        let result = sqlx::query(r"UPDATE tasks SET next_task_id = $2 WHERE task_id = $1")
            .bind(task_id.into_inner())
            .bind(next.map(TaskId::into_inner))
            .execute(self.pool)
            .await
            .map_err(DbError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("task", task_id));
        }
        Ok(())
    }

    /// Insert an unlinked tact.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_tact(&self, tact_name: &str) -> Result<TactId, DbError> {
        self.insert_named(r"INSERT INTO tacts (tact_name) VALUES ($1) RETURNING tact_id", tact_name)
            .await
            .map(TactId::new)
    }

    /// Point a tact at its successor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if `tact_id` does not exist, or
    /// [`DbError::ForeignKey`] if `next` does not.
    pub async fn link_tact(&self, tact_id: TactId, next: Option<TactId>) -> Result<(), DbError> {
        let result = sqlx::query(r"UPDATE tacts SET next_tact_id = $2 WHERE tact_id = $1")
            .bind(tact_id.into_inner())
            .bind(next.map(TactId::into_inner))
            .execute(self.pool)
            .await
            .map_err(DbError::from_write)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("tact", tact_id));
        }
        Ok(())
    }

    /// Insert a work label.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_work(&self, work_name: &str) -> Result<WorkId, DbError> {
        self.insert_named(r"INSERT INTO works (work_name) VALUES ($1) RETURNING work_id", work_name)
            .await
            .map(WorkId::new)
    }

    /// Insert an operator.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert_operator(&self, operator_name: &str) -> Result<OperatorId, DbError> {
        self.insert_named(
            r"INSERT INTO operators (operator_name) VALUES ($1) RETURNING operator_id",
            operator_name,
        )
        .await
        .map(OperatorId::new)
    }

    async fn insert_named(&self, sql: &'static str, name: &str) -> Result<i32, DbError> {
        let row: (i32,) = sqlx::query_as(sql)
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::from_write)?;
        Ok(row.0)
    }
}
