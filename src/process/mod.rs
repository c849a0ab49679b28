//! Process handle abstraction
//!
//! Defines the capability set the runner depends on:
//! - Output redirection configuration
//! - Start, kill, exit state and exit code
//! - An event stream of stdout/stderr chunks, end-of-stream markers,
//!   and a one-shot exit notification
//!
//! Two handles are provided: [`SystemProcess`] drives a real OS process,
//! [`ScriptedProcess`] replays a fixed output script in memory.

pub mod descriptor;
pub mod events;
pub mod scripted;
pub mod system;

use std::fmt;
use std::io;

use async_trait::async_trait;
use serde::Serialize;

pub use descriptor::ProcessDescriptor;
pub use events::Subscription;
pub use scripted::{ScriptProbe, ScriptedProcess};
pub use system::SystemProcess;

/// One of the two captured output streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Event delivered by a process handle to its subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A chunk of output text
    Chunk(Stream, String),
    /// The stream was closed; no further chunks follow
    End(Stream),
    /// The process exited (`None` when terminated by a signal)
    Exited { code: Option<i32> },
}

/// Which output streams are captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub stdout: bool,
    pub stderr: bool,
}

impl Redirect {
    /// Capture both streams
    pub const CAPTURE: Redirect = Redirect {
        stdout: true,
        stderr: true,
    };
}

impl Default for Redirect {
    fn default() -> Self {
        Self::CAPTURE
    }
}

/// A live process binding owned by a single run
///
/// Implementations deliver events through the [`Subscription`] passed to
/// [`subscribe`](ProcessHandle::subscribe). A handle is started at most once
/// and disposed exactly once; it is never reused across runs.
#[async_trait]
pub trait ProcessHandle: Send {
    /// Register the event subscriber
    fn subscribe(&mut self, subscription: Subscription);

    /// Detach the event subscriber; later events are dropped
    fn unsubscribe(&mut self);

    /// Configure output redirection (no interactive shell, stdin closed)
    fn configure(&mut self, redirect: Redirect);

    /// Start the process
    ///
    /// # Errors
    /// Any OS error raised while spawning
    fn start(&mut self) -> io::Result<()>;

    /// Kill the process
    ///
    /// Succeeds without effect when the process has already exited.
    ///
    /// # Errors
    /// The OS error raised by the kill attempt
    async fn kill(&mut self) -> io::Result<()>;

    /// Whether the process has exited
    fn has_exited(&self) -> bool;

    /// Exit code, once the process has exited normally
    fn exit_code(&self) -> Option<i32>;

    /// Human-readable command line for logs and errors
    fn describe(&self) -> String;

    /// Release all resources held by the handle
    fn dispose(&mut self);
}
