//! Data layer for the Simcast scenario results service.
//!
//! `PostgreSQL` is the system of record. An in-memory backend with the same
//! observable semantics serves tests and single-process demos. Callers use
//! the [`Store`] enum and never touch a backend directly.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration, migrations
//! - [`scenario_store`] -- scenarios, results, per-scenario averages
//! - [`task_log_store`] -- task timeline events and the joined listing
//! - [`reference_store`] -- tasks, tacts, works, operators
//! - [`memory`] -- in-memory backend
//! - [`store`] -- backend dispatch (the query layer)
//! - [`aggregate`] -- exact decimal averaging and rounding
//! - [`seed`] -- idempotent initial data
//! - [`error`] -- shared error types

pub mod aggregate;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod reference_store;
pub mod scenario_store;
pub mod seed;
pub mod store;
pub mod task_log_store;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use seed::{SeedReport, seed};
pub use store::Store;
