//! Initial data: the three demo scenarios and the timeline reference data.
//!
//! Each group is guarded by an emptiness check on its anchor table, so the
//! routine can run on every startup. Runs are serialized per database (an
//! advisory lock) or per memory store (a mutex), so the check and the
//! inserts act as one step.

use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::store::Store;

/// Scenario rows inserted into an empty `scenarios` table.
pub const SCENARIOS: [(&str, &str); 3] = [
    (
        "Status quo",
        "Simulation keeping the current staffing and overtime levels",
    ),
    (
        "One additional worker",
        "Simulation with one more worker added to the line",
    ),
    (
        "One extra overtime hour",
        "Simulation with one more hour of overtime per day",
    ),
];

/// Linear task chain, in order.
pub const TASKS: [&str; 6] = [
    "Receiving",
    "Inspection",
    "Picking",
    "Assembly",
    "Packing",
    "Shipping",
];

/// Linear tact chain, in order.
pub const TACTS: [&str; 3] = ["Tact 1", "Tact 2", "Tact 3"];

/// Work categories.
pub const WORKS: [&str; 3] = ["Manual work", "Machine work", "Quality check"];

/// Operators.
pub const OPERATORS: [&str; 4] = ["Operator A", "Operator B", "Operator C", "Operator D"];

/// What a seed run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Scenario rows inserted.
    pub scenarios: usize,
    /// Task rows inserted.
    pub tasks: usize,
    /// Tact rows inserted.
    pub tacts: usize,
    /// Work rows inserted.
    pub works: usize,
    /// Operator rows inserted.
    pub operators: usize,
}

impl SeedReport {
    /// Whether nothing was inserted.
    pub const fn is_empty(&self) -> bool {
        self.scenarios == 0
            && self.tasks == 0
            && self.tacts == 0
            && self.works == 0
            && self.operators == 0
    }

    const fn fill_reference(&mut self) {
        self.tasks = TASKS.len();
        self.tacts = TACTS.len();
        self.works = WORKS.len();
        self.operators = OPERATORS.len();
    }
}

/// Key of the transaction-scoped advisory lock that serializes seed runs
/// across processes sharing one database.
const SEED_LOCK_KEY: i64 = 0x5349_4D43_4153_5431;

/// Populate empty tables. Calling it again inserts nothing.
///
/// Concurrent runs against the same data (two servers starting on an empty
/// database, or two tasks sharing a memory store) insert each group once.
///
/// # Errors
///
/// Returns [`DbError`] if a lookup or insert fails. On `PostgreSQL` the
/// whole run is rolled back.
pub async fn seed(store: &Store) -> Result<SeedReport, DbError> {
    let report = match store {
        Store::Postgres(pg) => seed_postgres(pg.pool()).await?,
        Store::Memory(mem) => seed_memory(mem).await?,
    };

    tracing::info!(
        backend = store.backend(),
        scenarios = report.scenarios,
        tasks = report.tasks,
        tacts = report.tacts,
        works = report.works,
        operators = report.operators,
        "Seed complete"
    );

    Ok(report)
}

async fn seed_postgres(pool: &PgPool) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();
    let mut tx = pool.begin().await?;

    // Held until commit or rollback; a second run waits here and then sees
    // the committed rows.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SEED_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let (scenarios,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scenarios")
        .fetch_one(&mut *tx)
        .await?;
    if scenarios == 0 {
        for (name, description) in SCENARIOS {
            sqlx::query("INSERT INTO scenarios (scenario_name, description) VALUES ($1, $2)")
                .bind(name)
                .bind(description)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from_write)?;
        }
        report.scenarios = SCENARIOS.len();
    } else {
        tracing::info!(count = scenarios, "Scenarios already present, skipping");
    }

    let (tasks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
        .fetch_one(&mut *tx)
        .await?;
    if tasks == 0 {
        let task_ids = insert_names(
            &mut tx,
            "INSERT INTO tasks (task_name) VALUES ($1) RETURNING task_id",
            &TASKS,
        )
        .await?;
        link_pairs(&mut tx, "UPDATE tasks SET next_task_id = $2 WHERE task_id = $1", &task_ids).await?;

        let tact_ids = insert_names(
            &mut tx,
            "INSERT INTO tacts (tact_name) VALUES ($1) RETURNING tact_id",
            &TACTS,
        )
        .await?;
        link_pairs(&mut tx, "UPDATE tacts SET next_tact_id = $2 WHERE tact_id = $1", &tact_ids).await?;

        insert_names(
            &mut tx,
            "INSERT INTO works (work_name) VALUES ($1) RETURNING work_id",
            &WORKS,
        )
        .await?;
        insert_names(
            &mut tx,
            "INSERT INTO operators (operator_name) VALUES ($1) RETURNING operator_id",
            &OPERATORS,
        )
        .await?;

        report.fill_reference();
    }

    tx.commit().await?;
    Ok(report)
}

async fn insert_names(
    conn: &mut PgConnection,
    sql: &'static str,
    names: &[&str],
) -> Result<Vec<i32>, DbError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let (id,): (i32,) = sqlx::query_as(sql)
            .bind(*name)
            .fetch_one(&mut *conn)
            .await
            .map_err(DbError::from_write)?;
        ids.push(id);
    }
    Ok(ids)
}

async fn link_pairs(conn: &mut PgConnection, sql: &'static str, ids: &[i32]) -> Result<(), DbError> {
    for pair in ids.windows(2) {
        if let [id, next] = pair {
            sqlx::query(sql)
                .bind(*id)
                .bind(*next)
                .execute(&mut *conn)
                .await
                .map_err(DbError::from_write)?;
        }
    }
    Ok(())
}

async fn seed_memory(mem: &MemoryStore) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();
    let _guard = mem.seed_guard().await;

    let existing = mem.list_scenarios().await;
    if existing.is_empty() {
        for (name, description) in SCENARIOS {
            mem.insert_scenario(name, Some(description)).await?;
        }
        report.scenarios = SCENARIOS.len();
    } else {
        tracing::info!(count = existing.len(), "Scenarios already present, skipping");
    }

    if mem.tasks().await.is_empty() {
        let mut task_ids = Vec::with_capacity(TASKS.len());
        for name in TASKS {
            task_ids.push(mem.insert_task(name).await?);
        }
        for pair in task_ids.windows(2) {
            if let [id, next] = pair {
                mem.link_task(*id, Some(*next)).await?;
            }
        }

        let mut tact_ids = Vec::with_capacity(TACTS.len());
        for name in TACTS {
            tact_ids.push(mem.insert_tact(name).await?);
        }
        for pair in tact_ids.windows(2) {
            if let [id, next] = pair {
                mem.link_tact(*id, Some(*next)).await?;
            }
        }

        for name in WORKS {
            mem.insert_work(name).await?;
        }
        for name in OPERATORS {
            mem.insert_operator(name).await?;
        }

        report.fill_reference();
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let store = Store::memory();

        let first = seed(&store).await.unwrap();
        assert_eq!(first.scenarios, 3);
        assert_eq!(first.tasks, TASKS.len());

        let second = seed(&store).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_scenarios().await.unwrap().len(), 3);
        assert_eq!(store.list_tasks().await.unwrap().len(), TASKS.len());
    }

    #[tokio::test]
    async fn task_chain_is_linked_in_order() {
        let store = Store::memory();
        seed(&store).await.unwrap();

        let tasks = store.list_tasks().await.unwrap();
        let heads = tasks.iter().filter(|t| {
            !tasks
                .iter()
                .any(|other| other.next_task_id == Some(t.task_id))
        });
        assert_eq!(heads.count(), 1);
        assert_eq!(tasks.iter().filter(|t| t.next_task_id.is_none()).count(), 1);
    }

    #[tokio::test]
    async fn existing_scenarios_are_left_alone() {
        let store = Store::memory();
        store.insert_scenario("Custom", None).await.unwrap();

        let report = seed(&store).await.unwrap();
        assert_eq!(report.scenarios, 0);
        assert_eq!(report.works, WORKS.len());
        assert_eq!(store.list_scenarios().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_seeds_insert_each_group_once() {
        let store = Store::memory();

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { seed(&store).await })
            })
            .collect();

        let mut inserted = 0;
        for run in runs {
            inserted += run.await.unwrap().unwrap().scenarios;
        }

        assert_eq!(inserted, SCENARIOS.len());
        assert_eq!(store.list_scenarios().await.unwrap().len(), SCENARIOS.len());
        assert_eq!(store.list_tasks().await.unwrap().len(), TASKS.len());
        assert_eq!(store.list_operators().await.unwrap().len(), OPERATORS.len());
    }
}
