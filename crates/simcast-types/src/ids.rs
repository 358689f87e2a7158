//! Type-safe identifier wrappers around database integer keys.
//!
//! Every table has a strongly-typed ID to prevent accidentally passing a
//! task id where an operator id is expected. The wrappers serialize as
//! plain JSON numbers so the wire format matches the column values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around an integer key with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub $inner);

        impl $name {
            /// Wrap a raw key value.
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Return the raw key value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a scenario (a named configuration under study).
    ScenarioId(i32)
}

define_id! {
    /// Identifier of one stored simulation result row.
    SimulationResultId(i32)
}

define_id! {
    /// Identifier of a task in the task chain.
    TaskId(i32)
}

define_id! {
    /// Identifier of a tact (work-cycle/station label) in the tact chain.
    TactId(i32)
}

define_id! {
    /// Identifier of a work-category label.
    WorkId(i32)
}

define_id! {
    /// Identifier of an operator performing tasks.
    OperatorId(i32)
}

define_id! {
    /// Identifier of a task log event row.
    TaskLogId(i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&ScenarioId::new(3)).ok();
        assert_eq!(json.as_deref(), Some("3"));

        let restored: Result<TaskLogId, _> = serde_json::from_str("9000000000");
        assert_eq!(restored.ok(), Some(TaskLogId::new(9_000_000_000)));
    }

    #[test]
    fn id_display_matches_raw_value() {
        let id = OperatorId::from(17);
        assert_eq!(id.to_string(), "17");
        assert_eq!(i32::from(id), 17);
    }
}
