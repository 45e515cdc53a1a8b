//! Command execution seam.
//!
//! Every interaction with the system's disk utilities goes through the
//! [`Shell`] trait: the real [`SystemShell`] hands command lines to
//! `sh -c`, while [`SimulatedShell`] answers the known query pipelines
//! with canned data so the UI and tests can run without hardware.

mod simulated;
mod system;

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

pub use simulated::{SimDevice, SimulatedShell};
pub use system::SystemShell;

/// Why a query produced no usable result.
///
/// Callers uniformly treat a failed query as "feature absent", so the
/// public [`Shell::capture`] collapses this to an empty line list. The
/// distinction is kept internally: `Ok(vec![])` means the command ran
/// and printed nothing (or exited nonzero), `Err(Spawn)` means it never
/// started.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to start command: {0}")]
    Spawn(#[source] std::io::Error),
}

pub trait Shell: Send + Sync {
    /// Run a command line for its exit status. The caller is
    /// responsible for quoting.
    fn run(&self, command: &str) -> Result<i32, QueryError>;

    /// Run a command line and collect its stdout lines.
    fn capture_checked(&self, command: &str) -> Result<Vec<String>, QueryError>;

    /// Query variant used throughout the inventory: any failure
    /// degrades to an empty line list.
    fn capture(&self, command: &str) -> Vec<String> {
        self.capture_checked(command).unwrap_or_default()
    }
}

/// Pick the shell backend for this run.
pub fn get_shell(simulation: bool) -> Result<Arc<dyn Shell>> {
    if simulation {
        let root = std::env::temp_dir().join("usbmate-sim");
        return Ok(Arc::new(SimulatedShell::with_defaults(root)?));
    }
    Ok(Arc::new(SystemShell))
}
