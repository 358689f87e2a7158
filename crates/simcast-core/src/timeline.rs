//! Synthetic task-log timelines for one replication.
//!
//! The producer has no real simulation engine, so it fabricates a plausible
//! event sequence: tasks run one after another in chain order, each with
//! a `start`, an optional `pause`/`resume` pair, and an `end`. Timestamps
//! use a fixed-width format so that sorting the text sorts the events.

use chrono::{NaiveDateTime, TimeDelta};
use rand::Rng;
use rand::distr::{Bernoulli, Distribution};
use rand::seq::IndexedRandom;
use simcast_types::{NewTaskLog, OperatorId, ScenarioId, TactId, TaskId, TaskState, WorkId};

use crate::config::TimelineConfig;

/// Format of `time_stamp` values (e.g. `2025-10-23_09:21:11`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Format of the configured timeline start (e.g. `2025-10-23 09:00:00`).
pub const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from timeline setup.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// The configured start time does not match [`START_FORMAT`].
    #[error("invalid timeline start {value:?}: {source}")]
    Start {
        /// The rejected text.
        value: String,
        /// The parse failure.
        source: chrono::ParseError,
    },
}

/// Parse a configured start time.
///
/// # Errors
///
/// Returns [`TimelineError::Start`] if `value` is not `YYYY-MM-DD HH:MM:SS`.
pub fn parse_start(value: &str) -> Result<NaiveDateTime, TimelineError> {
    NaiveDateTime::parse_from_str(value, START_FORMAT).map_err(|source| TimelineError::Start {
        value: value.to_owned(),
        source,
    })
}

/// Everything needed to fabricate one replication's events.
#[derive(Debug, Clone)]
pub struct TimelinePlan<'a> {
    /// Tasks in execution order.
    pub task_ids: &'a [TaskId],
    /// Tacts in cycle order; assigned round-robin.
    pub tact_ids: &'a [TactId],
    /// Work categories; assigned round-robin by task position.
    pub work_ids: &'a [WorkId],
    /// Operators; one is drawn per task.
    pub operator_ids: &'a [OperatorId],
    /// Timestamp of the first event.
    pub start: NaiveDateTime,
    /// Minimum minutes between events (at least 1).
    pub min_step_minutes: u32,
    /// Maximum minutes between events.
    pub max_step_minutes: u32,
    /// Chance a task gets a pause/resume pair.
    pub pause_probability: f64,
    /// Chance a task is tied to a tact.
    pub tact_probability: f64,
}

impl<'a> TimelinePlan<'a> {
    /// Combine reference data with the timeline section of the config.
    pub const fn new(
        task_ids: &'a [TaskId],
        tact_ids: &'a [TactId],
        work_ids: &'a [WorkId],
        operator_ids: &'a [OperatorId],
        start: NaiveDateTime,
        config: &TimelineConfig,
    ) -> Self {
        Self {
            task_ids,
            tact_ids,
            work_ids,
            operator_ids,
            start,
            min_step_minutes: config.min_step_minutes,
            max_step_minutes: config.max_step_minutes,
            pause_probability: config.pause_probability,
            tact_probability: config.tact_probability,
        }
    }
}

/// One fabricated event, not yet bound to a scenario/replication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    /// Formatted with [`TIMESTAMP_FORMAT`].
    pub time_stamp: String,
    /// The task changing state.
    pub task_id: TaskId,
    /// Optional tact.
    pub tact_id: Option<TactId>,
    /// Work category.
    pub work_id: WorkId,
    /// Performing operator.
    pub operator_id: OperatorId,
    /// The transition.
    pub state: TaskState,
}

impl TimelineEvent {
    /// Bind the event to a run, producing an insertable row.
    pub fn into_new_log(self, scenario_id: ScenarioId, replication: i32) -> NewTaskLog {
        NewTaskLog {
            scenario_id,
            replication,
            time_stamp: self.time_stamp,
            task_id: self.task_id,
            tact_id: self.tact_id,
            work_id: self.work_id,
            operator_id: self.operator_id,
            state: self.state,
        }
    }
}

/// Fabricate the events of one replication.
///
/// Returns an empty timeline when there are no works or no operators,
/// since every event must reference both. Generation stops early if the
/// clock would overflow.
pub fn build_timeline<R: Rng + ?Sized>(rng: &mut R, plan: &TimelinePlan<'_>) -> Vec<TimelineEvent> {
    if plan.work_ids.is_empty() || plan.operator_ids.is_empty() {
        return Vec::new();
    }

    let step_lo = plan.min_step_minutes.max(1);
    let step_hi = plan.max_step_minutes.max(step_lo);
    let pause = Bernoulli::new(plan.pause_probability).ok();
    let tact = Bernoulli::new(plan.tact_probability).ok();

    let mut clock = plan.start;
    let mut events = Vec::with_capacity(plan.task_ids.len().saturating_mul(4));

    for (index, &task_id) in plan.task_ids.iter().enumerate() {
        let Some(&operator_id) = plan.operator_ids.choose(rng) else {
            break;
        };
        let Some(&work_id) = index
            .checked_rem(plan.work_ids.len())
            .and_then(|i| plan.work_ids.get(i))
        else {
            break;
        };
        let tied = tact.is_some_and(|d| d.sample(&mut *rng));
        let tact_id = if tied {
            index
                .checked_rem(plan.tact_ids.len())
                .and_then(|i| plan.tact_ids.get(i))
                .copied()
        } else {
            None
        };

        let mut states = vec![TaskState::Start];
        if pause.is_some_and(|d| d.sample(&mut *rng)) {
            states.push(TaskState::Pause);
            states.push(TaskState::Resume);
        }
        states.push(TaskState::End);

        for (position, state) in states.into_iter().enumerate() {
            if index > 0 || position > 0 {
                let minutes = rng.random_range(step_lo..=step_hi);
                let Some(next) = clock.checked_add_signed(TimeDelta::minutes(i64::from(minutes)))
                else {
                    return events;
                };
                clock = next;
            }
            events.push(TimelineEvent {
                time_stamp: clock.format(TIMESTAMP_FORMAT).to_string(),
                task_id,
                tact_id,
                work_id,
                operator_id,
                state,
            });
        }
    }

    events
}
