//! Enumeration types shared by the store, the API, and the producer.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle transition recorded by a task log row.
///
/// Stored and transmitted in lowercase (`start`, `end`, `pause`,
/// `resume`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TaskState {
    /// The task instance began.
    Start,
    /// The task instance finished.
    End,
    /// Work on the task was suspended.
    Pause,
    /// Suspended work continued.
    Resume,
}

impl TaskState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Start, Self::Pause, Self::Resume, Self::End];

    /// The canonical lowercase form used in the database and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a [`TaskState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task state: {0:?}")]
pub struct UnknownTaskState(pub String);

impl FromStr for TaskState {
    type Err = UnknownTaskState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            other => Err(UnknownTaskState(other.to_owned())),
        }
    }
}
