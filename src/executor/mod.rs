//! Command execution module
//!
//! Provides bounded, cancelable command execution with:
//! - Joint completion on exit, stdout end, and stderr end
//! - Timeout and caller cancellation
//! - Teardown of the process handle on every path

pub mod exec;
pub(crate) mod pump;
pub mod runner;
pub mod scope;
pub mod signal;

pub use exec::{exec_command, exec_command_sync, exec_shell_command, ExecOptions};
pub use runner::{ProcessRunner, RunState};
pub use scope::{timeout_from_millis, CancellationScope};
pub use signal::{CompletionSignal, RunSignals, Settled, SignalStatus};
