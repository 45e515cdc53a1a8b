use std::process::Command;

use tracing::debug;

use super::{QueryError, Shell};

/// Executes command lines through the platform interpreter.
///
/// Queries block the calling thread; the long-running write command is
/// kept off the UI loop by the command worker instead.
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, command: &str) -> Result<i32, QueryError> {
        debug!(%command, "executing");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(QueryError::Spawn)?;
        Ok(status.code().unwrap_or(-1))
    }

    fn capture_checked(&self, command: &str) -> Result<Vec<String>, QueryError> {
        debug!(%command, "querying");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(QueryError::Spawn)?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        Ok(trimmed.lines().map(str::to_string).collect())
    }
}
