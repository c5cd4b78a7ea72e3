//! Host command execution for lifecycle hooks

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, AppResult};

/// Runs a local command with a working directory, capturing stdio.
/// Blocking from the caller's perspective; no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, command: &[String], working_dir: &Path) -> AppResult<()>;
}

/// Executor backed by `tokio::process`. The child is killed when the future
/// is dropped, which is how context cancellation reaches host hooks.
#[derive(Debug, Clone, Default)]
pub struct HostExecutor;

#[async_trait]
impl Executor for HostExecutor {
    async fn run(&self, command: &[String], working_dir: &Path) -> AppResult<()> {
        let (program, args) = command.split_first().ok_or_else(|| {
            AppError::Validation("cannot execute an empty command".to_string())
        })?;

        tracing::debug!(?command, working_dir = %working_dir.display(), "Running command");

        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("failed to spawn {program}: {e}"))
            })?;

        if !output.stdout.is_empty() {
            tracing::debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Command output");
        }

        if !output.status.success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "command {:?} exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(())
    }
}
