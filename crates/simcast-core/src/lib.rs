//! Configuration, chain ordering, and result generation for Simcast.
//!
//! This crate holds the logic shared by the API server and the result
//! producer that does not touch the network or the database:
//!
//! - [`config`] -- `simcast-config.yaml` loading with env overrides
//! - [`chain`] -- turning task/tact "next id" links into ordered chains
//! - [`sampling`] -- fixed-point uniform sampling of result values
//! - [`timeline`] -- synthetic task-log event sequences per replication

pub mod chain;
pub mod config;
pub mod sampling;
pub mod timeline;

pub use chain::{ChainError, ChainNode, chain_links, order_chains, ordered_ids};
pub use config::{ConfigError, SimcastConfig, StorageBackend};
pub use sampling::{ResultSampler, SampledResult, SamplingError};
pub use timeline::{TimelineError, TimelineEvent, TimelinePlan, build_timeline};
