//! Scenario and simulation result operations on `PostgreSQL`.
//!
//! Results are append-only: rows are inserted one per transaction by the
//! producer and never updated. `(scenario_id, replication)` is unique.

use rust_decimal::Decimal;
use simcast_types::{
    NewSimulationResult, Scenario, ScenarioId, ScenarioSummary, SimulationResult,
    SimulationResultId,
};
use sqlx::PgPool;

use crate::aggregate;
use crate::error::DbError;

/// Operations on the `scenarios` and `simulation_results` tables.
pub struct ScenarioStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ScenarioStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every scenario ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Scenario>, DbError> {
        let rows = sqlx::query_as::<_, ScenarioRow>(
            r"SELECT scenario_id, scenario_name, description
              FROM scenarios
              ORDER BY scenario_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Scenario::from).collect())
    }

    /// Load one scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, scenario_id: ScenarioId) -> Result<Option<Scenario>, DbError> {
        let row = sqlx::query_as::<_, ScenarioRow>(
            r"SELECT scenario_id, scenario_name, description
              FROM scenarios
              WHERE scenario_id = $1",
        )
        .bind(scenario_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Scenario::from))
    }

    /// Insert a scenario and return its key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub async fn insert(
        &self,
        scenario_name: &str,
        description: Option<&str>,
    ) -> Result<ScenarioId, DbError> {
        let row: (i32,) = sqlx::query_as(
            r"INSERT INTO scenarios (scenario_name, description)
              VALUES ($1, $2)
              RETURNING scenario_id",
        )
        .bind(scenario_name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from_write)?;

        Ok(ScenarioId::new(row.0))
    }

    /// Insert one result row in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the replication already exists for
    /// the scenario, [`DbError::ForeignKey`] if the scenario does not
    /// exist, or [`DbError::Postgres`] for other failures. The transaction
    /// is rolled back in every error case.
    pub async fn insert_result(
        &self,
        result: &NewSimulationResult,
    ) -> Result<SimulationResultId, DbError> {
        let mut tx = self.pool.begin().await?;

        let row: (i32,) = sqlx::query_as(
            r"INSERT INTO simulation_results (scenario_id, replication, total_labor_costs, ontime_delivery_rate)
              VALUES ($1, $2, $3, $4)
              RETURNING sim_result_id",
        )
        .bind(result.scenario_id.into_inner())
        .bind(result.replication)
        .bind(result.total_labor_costs)
        .bind(result.ontime_delivery_rate)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from_write)?;

        tx.commit().await?;

        tracing::debug!(
            scenario_id = %result.scenario_id,
            replication = result.replication,
            sim_result_id = row.0,
            "Inserted simulation result"
        );

        Ok(SimulationResultId::new(row.0))
    }

    /// Every result row of one scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn results_for(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<SimulationResult>, DbError> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r"SELECT sim_result_id, scenario_id, replication, total_labor_costs, ontime_delivery_rate
              FROM simulation_results
              WHERE scenario_id = $1",
        )
        .bind(scenario_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(SimulationResult::from).collect())
    }

    /// Per-scenario averages. The inner join drops scenarios without
    /// results.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn summaries(&self) -> Result<Vec<ScenarioSummary>, DbError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r"SELECT s.scenario_id,
                     s.scenario_name,
                     AVG(r.total_labor_costs) AS average_total_costs,
                     AVG(r.ontime_delivery_rate) AS average_delivery_rate
              FROM scenarios s
              JOIN simulation_results r ON r.scenario_id = s.scenario_id
              GROUP BY s.scenario_id, s.scenario_name
              ORDER BY s.scenario_id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                aggregate::summary(
                    ScenarioId::new(row.scenario_id),
                    row.scenario_name,
                    row.average_total_costs,
                    row.average_delivery_rate,
                )
            })
            .collect())
    }

    /// Highest stored replication number of a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn max_replication(&self, scenario_id: ScenarioId) -> Result<Option<i32>, DbError> {
        let row: (Option<i32>,) = sqlx::query_as(
            r"SELECT MAX(replication) FROM simulation_results WHERE scenario_id = $1",
        )
        .bind(scenario_id.into_inner())
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }
}

/// A row from the `scenarios` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ScenarioRow {
    scenario_id: i32,
    scenario_name: String,
    description: Option<String>,
}

impl From<ScenarioRow> for Scenario {
    fn from(row: ScenarioRow) -> Self {
        Self {
            scenario_id: ScenarioId::new(row.scenario_id),
            scenario_name: row.scenario_name,
            description: row.description,
        }
    }
}

/// A row from the `simulation_results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ResultRow {
    sim_result_id: i32,
    scenario_id: i32,
    replication: i32,
    total_labor_costs: Decimal,
    ontime_delivery_rate: Decimal,
}

impl From<ResultRow> for SimulationResult {
    fn from(row: ResultRow) -> Self {
        Self {
            sim_result_id: SimulationResultId::new(row.sim_result_id),
            scenario_id: ScenarioId::new(row.scenario_id),
            replication: row.replication,
            total_labor_costs: row.total_labor_costs,
            ontime_delivery_rate: row.ontime_delivery_rate,
        }
    }
}

/// One grouped row of the summary query.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SummaryRow {
    scenario_id: i32,
    scenario_name: String,
    average_total_costs: Decimal,
    average_delivery_rate: Decimal,
}
