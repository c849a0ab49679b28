//! Error types for procrun
//!
//! Provides the typed run failures plus a serializable projection with
//! suggestions for common issues.

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// What triggered a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The caller's cancellation token fired
    Caller,
    /// The timeout budget elapsed
    Timeout,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Caller => write!(f, "canceled by caller"),
            CancelReason::Timeout => write!(f, "timed out"),
        }
    }
}

/// Failure of a single process run
#[derive(Error, Debug)]
pub enum RunError {
    /// The run was canceled and the process was stopped (or had already exited)
    #[error("Process run canceled: {reason}")]
    Canceled { reason: CancelReason },

    /// The process wrote to standard error
    #[error("{message}")]
    Process { message: String },

    /// Cancellation fired but the process could not be killed
    #[error("Failed to kill process: {0}")]
    Kill(#[source] io::Error),

    /// The process could not be configured or started
    #[error("Failed to start process: {command}")]
    Start {
        command: String,
        #[source]
        source: io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Build a process error from captured stderr text
    pub fn process(stderr: &str) -> Self {
        RunError::Process {
            message: stderr.trim_end_matches(&['\r', '\n'][..]).to_string(),
        }
    }

    /// Whether this is a cancellation (caller or timeout)
    pub fn is_canceled(&self) -> bool {
        matches!(self, RunError::Canceled { .. })
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Canceled { .. } => "canceled",
            RunError::Process { .. } => "process_error",
            RunError::Kill(_) => "kill_error",
            RunError::Start { .. } => "start_failed",
            RunError::Io(_) => "io_error",
        }
    }

    /// Exit code the CLI reports for this failure
    ///
    /// Mirrors the conventions of coreutils `timeout`.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Process { .. } => 1,
            RunError::Canceled {
                reason: CancelReason::Timeout,
            } => 124,
            RunError::Canceled {
                reason: CancelReason::Caller,
            } => 130,
            RunError::Kill(_) => 125,
            RunError::Start { source, .. } if source.kind() == io::ErrorKind::NotFound => 127,
            RunError::Start { .. } => 126,
            RunError::Io(_) => 1,
        }
    }
}

/// Serializable error info for JSON output
#[derive(Debug, Serialize, Clone)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CancelReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_error: Option<i32>,
}

impl From<&RunError> for ErrorInfo {
    fn from(err: &RunError) -> Self {
        match err {
            RunError::Canceled { reason } => ErrorInfo {
                message: err.to_string(),
                error_type: err.kind().to_string(),
                suggestion: match reason {
                    CancelReason::Timeout => Some(
                        "Try increasing the timeout or checking if the command hangs".to_string(),
                    ),
                    CancelReason::Caller => None,
                },
                stderr: None,
                reason: Some(*reason),
                os_error: None,
            },
            RunError::Process { message } => ErrorInfo {
                message: "Process reported an error on stderr".to_string(),
                error_type: err.kind().to_string(),
                suggestion: suggest_fix(message),
                stderr: Some(message.clone()),
                reason: None,
                os_error: None,
            },
            RunError::Kill(source) => ErrorInfo {
                message: err.to_string(),
                error_type: err.kind().to_string(),
                suggestion: Some(
                    "The process may still be running; check for orphaned processes".to_string(),
                ),
                stderr: None,
                reason: None,
                os_error: source.raw_os_error(),
            },
            RunError::Start { command, source } => ErrorInfo {
                message: format!("Failed to start process: {}", command),
                error_type: err.kind().to_string(),
                suggestion: suggest_fix(&source.to_string()),
                stderr: None,
                reason: None,
                os_error: source.raw_os_error(),
            },
            RunError::Io(source) => ErrorInfo {
                message: err.to_string(),
                error_type: err.kind().to_string(),
                suggestion: None,
                stderr: None,
                reason: None,
                os_error: source.raw_os_error(),
            },
        }
    }
}

/// Suggest fixes for common error patterns in process diagnostics
pub fn suggest_fix(diagnostic: &str) -> Option<String> {
    if diagnostic.contains("Permission denied") || diagnostic.contains("permission denied") {
        return Some(
            "Permission denied. Check file permissions or run with appropriate access.".to_string(),
        );
    }

    if diagnostic.contains("command not found")
        || diagnostic.contains("cannot find binary path")
        || diagnostic.contains("not found")
    {
        return Some("Required command not found. Check PATH and dependencies.".to_string());
    }

    if diagnostic.contains("No such file") {
        return Some(
            "File not found. Check the program path and working directory.".to_string(),
        );
    }

    if diagnostic.contains("Not a directory") {
        return Some("Working directory is not a directory.".to_string());
    }

    None
}
