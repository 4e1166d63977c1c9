//! External tool invocation and platform detection

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors raised while invoking an external tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found on PATH: {0}")]
    NotFound(String),

    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exceeded its {secs}s timeout")]
    Timeout { command: String, secs: u64 },
}

/// Captured result of one tool run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Whether the process exited successfully
    pub success: bool,
    /// Combined stdout + stderr
    pub output: String,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Run a shell command line in `cwd`, killing it after `timeout_secs`.
pub async fn run_tool(cmd: &str, cwd: &Path, timeout_secs: u64) -> Result<ToolOutput, ToolError> {
    debug!(command = cmd, cwd = %cwd.display(), "running tool");
    let start = Instant::now();

    let child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            command: cmd.to_string(),
            source,
        })?;

    let result = timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(ToolOutput {
                success: output.status.success(),
                output: format!("{}{}", stdout, stderr),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Ok(Err(source)) => Err(ToolError::Spawn {
            command: cmd.to_string(),
            source,
        }),
        Err(_) => Err(ToolError::Timeout {
            command: cmd.to_string(),
            secs: timeout_secs,
        }),
    }
}

/// Run a shell command line in `cwd` attached to the terminal, no timeout.
///
/// Returns whether the process exited successfully.
pub async fn run_interactive(cmd: &str, cwd: &Path) -> Result<bool, ToolError> {
    debug!(command = cmd, cwd = %cwd.display(), "running interactive tool");

    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| ToolError::Spawn {
            command: cmd.to_string(),
            source,
        })?;

    Ok(status.success())
}

/// Fail early with a readable error when a required binary is missing
pub fn require_tool(name: &str) -> Result<(), ToolError> {
    which::which(name)
        .map(|_| ())
        .map_err(|_| ToolError::NotFound(name.to_string()))
}

/// Number of physical cores (logical count when unknown)
pub fn physical_cores() -> usize {
    num_cpus::get_physical().max(1)
}

/// Default worker count: half the physical cores, rounded up.
///
/// Each build worker spawns its own compiler and bundler processes, so the
/// other half is left for them.
pub fn default_parallelism() -> usize {
    half_rounded_up(physical_cores())
}

fn half_rounded_up(cores: usize) -> usize {
    ((cores + 1) / 2).max(1)
}
