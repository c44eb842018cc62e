//! # Subprocess Execution
//!
//! `gcloud` and `kubectl` are black boxes: an argument vector goes in,
//! captured stdout/stderr and an exit status come out.
//!
//! [`CommandRunner`] is the single seam between the harness and the outside
//! world. Production uses [`SystemRunner`]; tests substitute a scripted fake.

mod invocation;

pub use invocation::{CommandOutput, Invocation};

use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, error, warn};

/// Runs one invocation to completion and captures its output
///
/// Only a failure to spawn is an `Err`; a non-zero exit is reported through
/// [`CommandOutput::status`] so callers decide how strict to be.
#[async_trait]
pub trait CommandRunner: Send + Sync + Debug {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| HarnessError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Run an invocation and require a zero exit status
///
/// Failures are logged with the combined output and returned as
/// [`HarnessError::CommandFailed`].
pub async fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput> {
    debug!("running: {}", invocation);
    let output = runner.output(invocation).await?;

    if !output.success() {
        let combined = output.combined();
        error!("❌ `{}` failed ({}): {}", invocation, output.status(), combined.trim());
        return Err(HarnessError::CommandFailed {
            command: invocation.to_string(),
            status: output.status(),
            output: combined,
        });
    }

    Ok(output)
}

/// Run a cleanup invocation; never fails
///
/// A non-zero exit whose output reports the object as missing is expected on
/// repeated teardown and only logged at debug. Returns whether the command
/// left the remote state clean (success or already gone).
pub async fn run_tolerant(runner: &dyn CommandRunner, invocation: &Invocation) -> bool {
    match runner.output(invocation).await {
        Ok(output) if output.success() => true,
        Ok(output) if output.is_not_found() => {
            debug!("already gone: {}", invocation);
            true
        }
        Ok(output) => {
            warn!(
                "cleanup `{}` failed ({}): {}",
                invocation,
                output.status(),
                output.combined().trim()
            );
            false
        }
        Err(e) => {
            warn!("cleanup `{}` could not run: {}", invocation, e);
            false
        }
    }
}

/// Verify the collaborator CLIs resolve on PATH before anything is created
pub fn ensure_tools(tools: &[&'static str]) -> Result<()> {
    for &tool in tools {
        let path = which::which(tool).map_err(|source| HarnessError::MissingTool { tool, source })?;
        debug!("found {} at {}", tool, path.display());
    }
    Ok(())
}
