//! In-memory process handle that replays a fixed output script
//!
//! Useful to drive the runner deterministically: the script decides what is
//! written to each stream, the exit code, how long the "process" runs, and
//! whether start or kill fail. A shared [`ScriptProbe`] records how the
//! handle was driven.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{ProcessEvent, ProcessHandle, Redirect, Stream, Subscription};

/// Observations of how a scripted handle was driven
#[derive(Debug, Default)]
pub struct ScriptProbe {
    started: AtomicBool,
    kills: AtomicUsize,
    unsubscribes: AtomicUsize,
    disposals: AtomicUsize,
    configured: Mutex<Option<Redirect>>,
}

impl ScriptProbe {
    /// Whether `start` was called
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of kill requests
    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Number of `unsubscribe` calls
    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Number of effective disposals
    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    /// Redirection passed to `configure`, if any
    pub fn configured(&self) -> Option<Redirect> {
        *self.configured.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    stdout: Vec<String>,
    stderr: Vec<String>,
    exit_code: i32,
    run_for: Duration,
    streams_linger: Duration,
    kill_error: Option<i32>,
    start_error: Option<io::ErrorKind>,
    duplicate_terminal_events: bool,
}

/// Scripted stand-in for an OS process
pub struct ScriptedProcess {
    script: Script,
    probe: Arc<ScriptProbe>,
    subscription: Option<Subscription>,
    exited: Arc<AtomicBool>,
    exit_code: Arc<Mutex<Option<i32>>>,
    task: Option<JoinHandle<()>>,
    disposed: bool,
}

impl Default for ScriptedProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProcess {
    /// A process that writes nothing and exits with code 0
    pub fn new() -> Self {
        Self {
            script: Script::default(),
            probe: Arc::new(ScriptProbe::default()),
            subscription: None,
            exited: Arc::new(AtomicBool::new(false)),
            exit_code: Arc::new(Mutex::new(None)),
            task: None,
            disposed: false,
        }
    }

    /// Append a stdout chunk
    pub fn stdout(mut self, chunk: impl Into<String>) -> Self {
        self.script.stdout.push(chunk.into());
        self
    }

    /// Append a stderr chunk
    pub fn stderr(mut self, chunk: impl Into<String>) -> Self {
        self.script.stderr.push(chunk.into());
        self
    }

    /// Exit code reported on exit
    pub fn exits_with(mut self, code: i32) -> Self {
        self.script.exit_code = code;
        self
    }

    /// Keep running this long after writing output
    pub fn run_for(mut self, duration: Duration) -> Self {
        self.script.run_for = duration;
        self
    }

    /// Keep stdout and stderr open this long after the exit event
    pub fn close_streams_after(mut self, delay: Duration) -> Self {
        self.script.streams_linger = delay;
        self
    }

    /// Fail kill requests with this raw OS error code
    pub fn kill_error(mut self, raw_os_error: i32) -> Self {
        self.script.kill_error = Some(raw_os_error);
        self
    }

    /// Fail `start` with this error kind
    pub fn start_error(mut self, kind: io::ErrorKind) -> Self {
        self.script.start_error = Some(kind);
        self
    }

    /// Emit the exit and end-of-stream events twice
    pub fn duplicate_terminal_events(mut self) -> Self {
        self.script.duplicate_terminal_events = true;
        self
    }

    /// Shared probe, valid after the handle is moved into a runner
    pub fn probe(&self) -> Arc<ScriptProbe> {
        self.probe.clone()
    }

    fn mark_exited(&self, code: Option<i32>) {
        *self.exit_code.lock().unwrap_or_else(PoisonError::into_inner) = code;
        self.exited.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcessHandle for ScriptedProcess {
    fn subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    fn unsubscribe(&mut self) {
        self.probe.unsubscribes.fetch_add(1, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.take() {
            subscription.detach();
        }
    }

    fn configure(&mut self, redirect: Redirect) {
        *self
            .probe
            .configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(redirect);
    }

    fn start(&mut self) -> io::Result<()> {
        if let Some(kind) = self.script.start_error {
            return Err(io::Error::new(kind, "scripted start failure"));
        }
        self.probe.started.store(true, Ordering::SeqCst);

        let script = self.script.clone();
        let events = self
            .subscription
            .clone()
            .unwrap_or_else(Subscription::detached);
        let exited = self.exited.clone();
        let exit_code = self.exit_code.clone();

        self.task = Some(tokio::spawn(async move {
            for chunk in script.stdout {
                events.emit(ProcessEvent::Chunk(Stream::Stdout, chunk));
            }
            for chunk in script.stderr {
                events.emit(ProcessEvent::Chunk(Stream::Stderr, chunk));
            }

            if !script.run_for.is_zero() {
                tokio::time::sleep(script.run_for).await;
            }

            *exit_code.lock().unwrap_or_else(PoisonError::into_inner) = Some(script.exit_code);
            exited.store(true, Ordering::SeqCst);

            let rounds = if script.duplicate_terminal_events { 2 } else { 1 };
            for _ in 0..rounds {
                events.emit(ProcessEvent::Exited {
                    code: Some(script.exit_code),
                });
            }

            if !script.streams_linger.is_zero() {
                tokio::time::sleep(script.streams_linger).await;
            }

            for _ in 0..rounds {
                events.emit(ProcessEvent::End(Stream::Stdout));
                events.emit(ProcessEvent::End(Stream::Stderr));
            }
        }));

        Ok(())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.probe.kills.fetch_add(1, Ordering::SeqCst);

        if self.has_exited() {
            return Ok(());
        }
        if let Some(code) = self.script.kill_error {
            return Err(io::Error::from_raw_os_error(code));
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.mark_exited(None);
        Ok(())
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn describe(&self) -> String {
        "scripted-process".to_string()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.probe.disposals.fetch_add(1, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
