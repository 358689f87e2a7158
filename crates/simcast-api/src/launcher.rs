//! Detached launch of the result producer process.
//!
//! `POST /api/simulations` returns as soon as the child is spawned. A
//! watcher task reaps the child and logs how it exited; nothing waits on
//! it.

use std::process::Stdio;

use simcast_core::config::ProducerConfig;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Errors from launching the producer.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

/// Spawns the producer program with fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerLauncher {
    program: String,
    args: Vec<String>,
}

impl ProducerLauncher {
    /// Launch `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Launcher for the configured producer.
    pub fn from_config(config: &ProducerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// The program this launcher runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Start the producer and return its process id, if the OS reports one.
    ///
    /// The child inherits the environment (so `SIMCAST_CONFIG` and
    /// `DATABASE_URL` carry over) and stdout/stderr; stdin is closed.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Spawn`] if the process cannot be started.
    pub fn launch(&self) -> Result<Option<u32>, LaunchError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let pid = child.id();
        info!(program = %self.program, pid = ?pid, "Producer started");

        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(program = %program, pid = ?pid, "Producer finished");
                }
                Ok(status) => {
                    warn!(program = %program, pid = ?pid, %status, "Producer exited with failure");
                }
                Err(e) => {
                    error!(program = %program, pid = ?pid, error = %e, "Failed to wait on producer");
                }
            }
        });

        Ok(pid)
    }
}
