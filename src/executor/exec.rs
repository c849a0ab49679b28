//! Convenience entry points pairing a descriptor with a runner
//!
//! Provides a unified interface for running commands with:
//! - Configurable timeouts (signed milliseconds or a `Duration`)
//! - Caller cancellation
//! - Captured stdout, with stderr content reported as a failure

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::runner::ProcessRunner;
use super::scope::timeout_from_millis;
use crate::error::RunError;
use crate::process::{ProcessDescriptor, SystemProcess};

/// Options for a single command execution
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Timeout duration (None = no timeout)
    pub timeout: Option<Duration>,
    /// Caller cancellation; never canceled by the run itself
    pub cancellation: CancellationToken,
}

impl ExecOptions {
    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set timeout in milliseconds; negative disables it
    pub fn with_timeout_ms(mut self, ms: i64) -> Self {
        self.timeout = timeout_from_millis(ms);
        self
    }

    /// Observe a caller-owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

fn runner_for(descriptor: ProcessDescriptor, options: &ExecOptions) -> ProcessRunner<SystemProcess> {
    tracing::debug!("Executing: {}", descriptor.command_line());
    ProcessRunner::new(
        SystemProcess::new(descriptor),
        options.timeout,
        options.cancellation.clone(),
    )
}

/// Execute a command and return its stdout
///
/// # Errors
/// * `RunError::Start` - If the command couldn't be spawned
/// * `RunError::Process` - If the command wrote to stderr
/// * `RunError::Canceled` - If the timeout elapsed or the caller canceled
/// * `RunError::Kill` - If the command could not be stopped after cancellation
pub async fn exec_command(
    descriptor: ProcessDescriptor,
    options: &ExecOptions,
) -> Result<String, RunError> {
    runner_for(descriptor, options).run_async().await
}

/// Execute a command synchronously (convenience wrapper for sync contexts)
///
/// Must not be called from inside an async runtime.
pub fn exec_command_sync(
    descriptor: ProcessDescriptor,
    options: &ExecOptions,
) -> Result<String, RunError> {
    runner_for(descriptor, options).run()
}

/// Execute a command string through a shell
///
/// # Arguments
/// * `shell` - Shell to use (e.g., "bash", "sh", "cmd")
/// * `command` - Command string to execute
/// * `options` - Execution options
pub async fn exec_shell_command(
    shell: &str,
    command: &str,
    options: &ExecOptions,
) -> Result<String, RunError> {
    exec_command(ProcessDescriptor::shell(shell, command), options).await
}
