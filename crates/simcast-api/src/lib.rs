//! HTTP and `WebSocket` surface of the Simcast scenario results service.
//!
//! - **REST endpoints** for scenarios, replication results, per-scenario
//!   averages, task timelines and the task/tact chains
//! - **`WebSocket` endpoint** (`/ws/results`) that pushes the current
//!   averages to every client when the producer reports completion
//! - **Producer launch** (`POST /api/simulations`) as a detached process
//!
//! # Architecture
//!
//! Handlers read through [`simcast_db::Store`]. Open sockets live in a
//! [`ConnectionRegistry`] owned by [`AppState`]; a notification
//! recomputes the averages, encodes them once, and fans the frame out to
//! every connection's bounded queue. A failed or stalled connection is
//! dropped without affecting the others.

pub mod broadcast;
pub mod error;
pub mod handlers;
pub mod launcher;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use launcher::{LaunchError, ProducerLauncher};
pub use registry::{BroadcastReport, ConnectionId, ConnectionRegistry};
pub use router::{build_router, build_router_with_origins};
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::AppState;
