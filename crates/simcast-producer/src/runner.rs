//! The production loop: one result row per (scenario, replication).
//!
//! Each row is written in its own transaction as soon as it is sampled. A
//! failed write is logged and counted, and the loop moves on. Replication
//! numbers continue after the highest one already stored, so repeated runs
//! append instead of colliding.

use std::time::Duration;

use chrono::NaiveDateTime;
use rand::Rng;
use simcast_core::config::{ProducerConfig, TimelineConfig};
use simcast_core::timeline::parse_start;
use simcast_core::{ResultSampler, TimelinePlan, build_timeline, ordered_ids};
use simcast_db::Store;
use simcast_types::{NewSimulationResult, OperatorId, ScenarioId, TactId, TaskId, WorkId};
use tracing::{debug, info, warn};

use crate::error::ProducerError;

/// Counters for one production run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductionReport {
    /// Result rows stored.
    pub results_written: u32,
    /// Result rows that could not be sampled or stored.
    pub results_failed: u32,
    /// Task log rows stored.
    pub logs_written: u32,
    /// Task log rows that could not be stored.
    pub logs_failed: u32,
    /// Whether the API acknowledged the completion callback.
    pub notified: bool,
}

/// Reference data the timeline generator draws from, loaded once per run.
#[derive(Debug, Clone, Default)]
struct Reference {
    tasks: Vec<TaskId>,
    tacts: Vec<TactId>,
    works: Vec<WorkId>,
    operators: Vec<OperatorId>,
}

/// Writes sampled results (and optionally a synthetic timeline) to a store.
#[derive(Debug, Clone)]
pub struct Producer {
    store: Store,
    sampler: ResultSampler,
    scenario_ids: Vec<ScenarioId>,
    replications: u32,
    iteration_delay: Duration,
    timeline: TimelineConfig,
}

impl Producer {
    /// Build a producer from the `producer` config section.
    pub fn new(store: Store, config: &ProducerConfig) -> Self {
        Self {
            store,
            sampler: ResultSampler::from_config(config),
            scenario_ids: config.scenario_ids.iter().copied().map(ScenarioId::new).collect(),
            replications: config.replications,
            iteration_delay: Duration::from_millis(config.iteration_delay_ms),
            timeline: config.timeline.clone(),
        }
    }

    /// Produce every configured replication of every configured scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Timeline`] if the timeline start is
    /// malformed. Write failures never abort the run.
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ProductionReport, ProducerError> {
        let mut report = ProductionReport::default();
        let reference = self.load_reference().await;
        let start = if self.timeline.enabled {
            Some(parse_start(&self.timeline.start)?)
        } else {
            None
        };

        for &scenario_id in &self.scenario_ids {
            let first = match self.store.next_replication(scenario_id).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(%scenario_id, error = %e, "Cannot determine next replication, skipping scenario");
                    report.results_failed = report.results_failed.saturating_add(self.replications);
                    continue;
                }
            };
            info!(%scenario_id, first_replication = first, count = self.replications, "Producing scenario");

            for offset in 0..self.replications {
                let Some(replication) = i32::try_from(offset)
                    .ok()
                    .and_then(|o| first.checked_add(o))
                else {
                    warn!(%scenario_id, "Replication counter overflow, stopping scenario");
                    break;
                };

                if self.write_result(rng, scenario_id, replication).await {
                    report.results_written = report.results_written.saturating_add(1);
                    if let (Some(start), Some(reference)) = (start, reference.as_ref()) {
                        self.write_timeline(rng, reference, start, scenario_id, replication, &mut report)
                            .await;
                    }
                } else {
                    report.results_failed = report.results_failed.saturating_add(1);
                }

                if !self.iteration_delay.is_zero() {
                    tokio::time::sleep(self.iteration_delay).await;
                }
            }
        }

        info!(
            results_written = report.results_written,
            results_failed = report.results_failed,
            logs_written = report.logs_written,
            logs_failed = report.logs_failed,
            "Production finished"
        );
        Ok(report)
    }

    async fn write_result<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        scenario_id: ScenarioId,
        replication: i32,
    ) -> bool {
        let sampled = match self.sampler.sample(rng) {
            Ok(sampled) => sampled,
            Err(e) => {
                warn!(%scenario_id, replication, error = %e, "Sampling failed");
                return false;
            }
        };

        let row = NewSimulationResult {
            scenario_id,
            replication,
            total_labor_costs: sampled.total_labor_costs,
            ontime_delivery_rate: sampled.ontime_delivery_rate,
        };
        match self.store.insert_result(&row).await {
            Ok(id) => {
                info!(
                    %scenario_id,
                    replication,
                    sim_result_id = %id,
                    total_labor_costs = %row.total_labor_costs,
                    ontime_delivery_rate = %row.ontime_delivery_rate,
                    "Result written"
                );
                true
            }
            Err(e) => {
                warn!(%scenario_id, replication, error = %e, "Result write failed, continuing");
                false
            }
        }
    }

    async fn write_timeline<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        reference: &Reference,
        start: NaiveDateTime,
        scenario_id: ScenarioId,
        replication: i32,
        report: &mut ProductionReport,
    ) {
        let plan = TimelinePlan::new(
            &reference.tasks,
            &reference.tacts,
            &reference.works,
            &reference.operators,
            start,
            &self.timeline,
        );

        for event in build_timeline(rng, &plan) {
            let log = event.into_new_log(scenario_id, replication);
            match self.store.insert_task_log(&log).await {
                Ok(_) => report.logs_written = report.logs_written.saturating_add(1),
                Err(e) => {
                    warn!(%scenario_id, replication, time_stamp = %log.time_stamp, error = %e, "Task log write failed, continuing");
                    report.logs_failed = report.logs_failed.saturating_add(1);
                }
            }
        }
        debug!(%scenario_id, replication, "Timeline written");
    }

    /// Ordered reference data, or `None` when the timeline is disabled or
    /// the data cannot be used.
    async fn load_reference(&self) -> Option<Reference> {
        if !self.timeline.enabled {
            return None;
        }

        let loaded = async {
            let tasks = self.store.list_tasks().await?;
            let tacts = self.store.list_tacts().await?;
            let works = self.store.list_works().await?;
            let operators = self.store.list_operators().await?;
            Ok::<_, ProducerError>((tasks, tacts, works, operators))
        }
        .await;

        let (tasks, tacts, works, operators) = match loaded {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Cannot load reference data, timeline disabled");
                return None;
            }
        };

        let (task_order, tact_order) = match (ordered_ids(&tasks), ordered_ids(&tacts)) {
            (Ok(t), Ok(c)) => (t, c),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Invalid task or tact chain, timeline disabled");
                return None;
            }
        };

        Some(Reference {
            tasks: task_order.into_iter().map(TaskId::new).collect(),
            tacts: tact_order.into_iter().map(TactId::new).collect(),
            works: works.iter().map(|w| w.work_id).collect(),
            operators: operators.iter().map(|o| o.operator_id).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use simcast_db::seed;

    use super::*;

    fn config(scenarios: Vec<i32>, replications: u32, timeline: bool) -> ProducerConfig {
        let mut config = ProducerConfig {
            scenario_ids: scenarios,
            replications,
            iteration_delay_ms: 0,
            ..ProducerConfig::default()
        };
        config.timeline.enabled = timeline;
        config
    }

    async fn seeded() -> Store {
        let store = Store::memory();
        seed(&store).await.unwrap();
        store
    }

    #[tokio::test]
    async fn writes_one_row_per_replication() {
        let store = seeded().await;
        let producer = Producer::new(store.clone(), &config(vec![1, 2], 3, false));

        let report = producer.run(&mut StdRng::seed_from_u64(1)).await.unwrap();
        assert_eq!(report.results_written, 6);
        assert_eq!(report.results_failed, 0);
        assert_eq!(report.logs_written, 0);

        let summaries = store.scenario_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let detail = store.scenario_detail(ScenarioId::new(1)).await.unwrap();
        for row in &detail.replications {
            assert!(row.total_labor_costs >= ProducerConfig::default().labor_costs_min);
            assert!(row.total_labor_costs <= ProducerConfig::default().labor_costs_max);
            assert!(row.total_labor_costs.scale() <= 2);
        }
    }

    #[tokio::test]
    async fn second_run_appends_after_existing_replications() {
        let store = seeded().await;
        let producer = Producer::new(store.clone(), &config(vec![1], 2, false));
        let mut rng = StdRng::seed_from_u64(2);

        producer.run(&mut rng).await.unwrap();
        let report = producer.run(&mut rng).await.unwrap();
        assert_eq!(report.results_written, 2);
        assert_eq!(report.results_failed, 0);

        let mut reps: Vec<i32> = store
            .scenario_detail(ScenarioId::new(1))
            .await
            .unwrap()
            .replications
            .iter()
            .map(|r| r.replication)
            .collect();
        reps.sort_unstable();
        assert_eq!(reps, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn unknown_scenario_fails_per_row_and_continues() {
        let store = seeded().await;
        let producer = Producer::new(store.clone(), &config(vec![99, 3], 2, false));

        let report = producer.run(&mut StdRng::seed_from_u64(3)).await.unwrap();
        assert_eq!(report.results_failed, 2);
        assert_eq!(report.results_written, 2);
        assert_eq!(store.scenario_detail(ScenarioId::new(3)).await.unwrap().replications.len(), 2);
    }

    #[tokio::test]
    async fn timeline_rows_follow_each_result() {
        let store = seeded().await;
        let producer = Producer::new(store.clone(), &config(vec![1], 1, true));

        let report = producer.run(&mut StdRng::seed_from_u64(4)).await.unwrap();
        assert_eq!(report.logs_failed, 0);
        assert!(report.logs_written >= 12);

        let logs = store.task_logs(ScenarioId::new(1), 1).await.unwrap();
        assert_eq!(logs.len(), usize::try_from(report.logs_written).unwrap());
        assert!(logs.windows(2).all(|w| match w {
            [a, b] => a.time_stamp <= b.time_stamp,
            _ => true,
        }));
        assert_eq!(logs.first().map(|l| l.task_name.as_str()), Some(seed::TASKS[0]));
    }

    #[tokio::test]
    async fn timeline_is_skipped_without_reference_data() {
        let store = Store::memory();
        store.insert_scenario("bare", None).await.unwrap();
        let producer = Producer::new(store, &config(vec![1], 2, true));

        let report = producer.run(&mut StdRng::seed_from_u64(5)).await.unwrap();
        assert_eq!(report.results_written, 2);
        assert_eq!(report.logs_written, 0);
    }

    #[tokio::test]
    async fn malformed_timeline_start_is_an_error() {
        let store = seeded().await;
        let mut cfg = config(vec![1], 1, true);
        cfg.timeline.start = String::from("yesterday");
        let producer = Producer::new(store, &cfg);

        let err = producer.run(&mut StdRng::seed_from_u64(6)).await.unwrap_err();
        assert!(matches!(err, ProducerError::Timeline(_)));
    }
}
