//! procrun - Bounded, cancelable external-process runner
//!
//! Launches a child process, captures its stdout and stderr, and resolves to
//! either the captured stdout text or a typed failure:
//! - **Process** - the process wrote to stderr
//! - **Canceled** - the caller canceled or the timeout elapsed, and the
//!   process was stopped
//! - **Kill** - the process could not be stopped
//! - **Start** - the process could not be started
//!
//! ## Features
//!
//! - Joint completion on exit, stdout end, and stderr end
//! - Timeout armed at start (negative disables, zero expires immediately)
//! - Caller cancellation through a `CancellationToken`
//! - Exactly-once teardown of the process handle on every path
//! - XDG-compliant layered configuration with named command presets
//!
//! ## Example
//!
//! ```no_run
//! use procrun::{exec_command, ExecOptions, ProcessDescriptor};
//!
//! # async fn demo() -> Result<(), procrun::RunError> {
//! let options = ExecOptions::default().with_timeout_ms(5_000);
//! let stdout = exec_command(ProcessDescriptor::new("echo").arg("hi"), &options).await?;
//! assert_eq!(stdout, "hi\n");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod process;

pub use cli::{Cli, Commands};
pub use config::{load_config, Config};
pub use error::{CancelReason, ErrorInfo, RunError};
pub use executor::{
    exec_command, exec_command_sync, exec_shell_command, timeout_from_millis, ExecOptions,
    ProcessRunner, RunState,
};
pub use process::{
    ProcessDescriptor, ProcessEvent, ProcessHandle, Redirect, ScriptedProcess, Stream,
    Subscription, SystemProcess,
};
