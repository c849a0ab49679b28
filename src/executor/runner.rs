//! Bounded, cancelable process runner
//!
//! A [`ProcessRunner`] owns one process lifecycle from start to teardown. It
//! multiplexes three completion sources (exit, stdout end, stderr end) and two
//! cancellation sources (caller token, timeout) into a single outcome:
//! - stdout text when stderr stayed empty
//! - [`RunError::Process`] when stderr had content
//! - [`RunError::Canceled`] when cancellation fired and the process was stopped
//! - [`RunError::Kill`] when the process could not be stopped
//! - [`RunError::Start`] when the process could not be started

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use super::pump::EventPump;
use super::scope::CancellationScope;
use super::signal::{RunSignals, Settled};
use crate::error::RunError;
use crate::process::{ProcessEvent, ProcessHandle, Redirect, Subscription};

/// Lifecycle of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Started,
    Succeeded,
    Canceled,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Created => "created",
            RunState::Started => "started",
            RunState::Succeeded => "succeeded",
            RunState::Canceled => "canceled",
            RunState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

enum Wake {
    Event(ProcessEvent),
    Closed,
    Canceled,
    Idle,
}

/// Runs a single process to completion, cancellation, or failure
///
/// The runner takes exclusive ownership of the handle. Both entry points
/// consume the runner, so a handle is never reused across runs, and the
/// handle is disposed exactly once whichever path the run takes (including
/// the run future being dropped mid-flight).
///
/// # Example
/// ```no_run
/// use procrun::{ProcessDescriptor, ProcessRunner, SystemProcess};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let process = SystemProcess::new(ProcessDescriptor::new("echo").arg("hi"));
/// let runner = ProcessRunner::new(process, Some(Duration::from_secs(5)), CancellationToken::new());
/// assert_eq!(runner.run().unwrap(), "hi\n");
/// ```
pub struct ProcessRunner<P: ProcessHandle> {
    process: P,
    scope: CancellationScope,
    signals: RunSignals,
    pump: EventPump,
    state: RunState,
    torn_down: bool,
}

impl<P: ProcessHandle> ProcessRunner<P> {
    /// Create a runner for an unstarted handle
    ///
    /// `timeout` of `None` disables the timeout; `Some(Duration::ZERO)`
    /// cancels as soon as the process starts.
    pub fn new(process: P, timeout: Option<Duration>, cancellation: CancellationToken) -> Self {
        let signals = RunSignals::new();
        Self {
            process,
            scope: CancellationScope::new(&cancellation, timeout),
            signals: signals.clone(),
            pump: EventPump::new(signals),
            state: RunState::Created,
            torn_down: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The enforced timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.scope.budget()
    }

    /// Run to completion, blocking the calling thread
    ///
    /// Drives the run on a private current-thread runtime.
    ///
    /// # Errors
    /// Same as [`run_async`](Self::run_async), plus [`RunError::Io`] when
    /// called from inside an async runtime or when the runtime cannot be built.
    pub fn run(self) -> Result<String, RunError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(RunError::Io(io::Error::other(
                "blocking run called inside an async runtime; use run_async",
            )));
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RunError::Io(io::Error::other(format!("Failed to create runtime: {}", e))))?;

        rt.block_on(self.run_async())
    }

    /// Run to completion
    ///
    /// # Errors
    /// - [`RunError::Canceled`] - caller cancellation or timeout stopped the run
    /// - [`RunError::Process`] - the process wrote to stderr
    /// - [`RunError::Kill`] - cancellation fired but the kill attempt failed
    /// - [`RunError::Start`] - the process could not be started
    pub async fn run_async(mut self) -> Result<String, RunError> {
        let outcome = self.execute().await;

        self.transition(match &outcome {
            Ok(_) => RunState::Succeeded,
            Err(RunError::Canceled { .. }) => RunState::Canceled,
            Err(_) => RunState::Failed,
        });
        self.teardown();

        outcome
    }

    async fn execute(&mut self) -> Result<String, RunError> {
        if self.scope.is_cancelled() {
            let reason = self.scope.reason();
            tracing::debug!("Cancellation requested before start: {}", reason);
            self.signals.cancel_pending();
            return Err(RunError::Canceled { reason });
        }

        let (subscription, mut events) = Subscription::channel();
        self.process.subscribe(subscription);

        self.process.configure(Redirect::CAPTURE);
        self.scope.arm();

        if let Err(source) = self.process.start() {
            let command = self.process.describe();
            tracing::debug!("Failed to start {}: {}", command, source);
            return Err(RunError::Start { command, source });
        }
        self.transition(RunState::Started);

        // Events are pumped on this task; the cancel path first handles
        // whatever the handle delivered before the scope fired
        let mut stream_open = true;
        let mut cancel_observed = false;
        while !self.signals.all_are_settled() {
            let wake = tokio::select! {
                biased;
                _ = self.scope.cancelled(), if !cancel_observed => Wake::Canceled,
                event = events.recv(), if stream_open => match event {
                    Some(event) => Wake::Event(event),
                    None => Wake::Closed,
                },
                else => Wake::Idle,
            };

            match wake {
                Wake::Event(event) => self.pump.handle(event),
                Wake::Closed => stream_open = false,
                Wake::Canceled => {
                    cancel_observed = true;
                    if self.handle_cancel(&mut events).await {
                        break;
                    }
                }
                Wake::Idle => break,
            }
        }

        self.classify()
    }

    /// React to the scope firing; returns whether the run is over
    async fn handle_cancel(&mut self, events: &mut UnboundedReceiver<ProcessEvent>) -> bool {
        self.pump.drain_queued(events);
        if self.signals.exited.is_settled() {
            // The process is gone; let its streams finish
            tracing::debug!("Ignoring cancellation after exit: {}", self.scope.reason());
            return false;
        }

        tracing::debug!("Run canceled: {}", self.scope.reason());

        if !self.process.has_exited() {
            if let Err(err) = self.process.kill().await {
                tracing::debug!("Failed to kill {}: {}", self.process.describe(), err);
                self.signals.exited.try_fail(RunError::Kill(err));
                return true;
            }
        }

        self.signals.cancel_pending();
        true
    }

    fn classify(&self) -> Result<String, RunError> {
        let canceled = || RunError::Canceled {
            reason: self.scope.reason(),
        };

        match self.signals.exited.take() {
            Some(Settled::Value(success)) => {
                if !success {
                    tracing::debug!(
                        exit_code = ?self.process.exit_code(),
                        "Process exited unsuccessfully"
                    );
                }
            }
            Some(Settled::Failed(err)) => return Err(err),
            Some(Settled::Canceled) | None => return Err(canceled()),
        }

        let stdout = match self.signals.stdout.take() {
            Some(Settled::Value(text)) => text,
            Some(Settled::Failed(err)) => return Err(err),
            Some(Settled::Canceled) | None => return Err(canceled()),
        };

        match self.signals.stderr.take() {
            Some(Settled::Value(_)) => Ok(stdout),
            Some(Settled::Failed(err)) => Err(err),
            Some(Settled::Canceled) | None => Err(canceled()),
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!("Runner {} -> {} ({})", self.state, next, self.process.describe());
        self.state = next;
    }

    /// Release the handle and the timer; runs once
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.process.unsubscribe();
        self.process.dispose();
        self.scope.dispose();
    }
}

impl<P: ProcessHandle> Drop for ProcessRunner<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CancelReason;
    use crate::process::ProcessEvent;
    use crate::process::Stream;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};

    mock! {
        pub Process {}

        #[async_trait]
        impl ProcessHandle for Process {
            fn subscribe(&mut self, subscription: Subscription);
            fn unsubscribe(&mut self);
            fn configure(&mut self, redirect: Redirect);
            fn start(&mut self) -> io::Result<()>;
            async fn kill(&mut self) -> io::Result<()>;
            fn has_exited(&self) -> bool;
            fn exit_code(&self) -> Option<i32>;
            fn describe(&self) -> String;
            fn dispose(&mut self);
        }
    }

    fn mock_process() -> MockProcess {
        let mut process = MockProcess::new();
        process.expect_describe().return_const("mock".to_string());
        process
    }

    #[tokio::test]
    async fn test_start_error_still_tears_down() {
        let mut process = mock_process();
        process.expect_subscribe().times(1).return_const(());
        process
            .expect_configure()
            .with(eq(Redirect::CAPTURE))
            .times(1)
            .return_const(());
        process
            .expect_start()
            .times(1)
            .returning(|| Err(io::Error::new(io::ErrorKind::NotFound, "no such program")));
        process.expect_unsubscribe().times(1).return_const(());
        process.expect_dispose().times(1).return_const(());

        let runner = ProcessRunner::new(process, None, CancellationToken::new());
        let err = runner.run_async().await.unwrap_err();

        match err {
            RunError::Start { command, source } => {
                assert_eq!(command, "mock");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("Expected start error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_precanceled_never_starts() {
        let mut process = mock_process();
        process.expect_start().never();
        process.expect_subscribe().never();
        process.expect_unsubscribe().times(1).return_const(());
        process.expect_dispose().times(1).return_const(());

        let token = CancellationToken::new();
        token.cancel();

        let runner = ProcessRunner::new(process, Some(Duration::from_secs(5)), token);
        let err = runner.run_async().await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Canceled {
                reason: CancelReason::Caller
            }
        ));
    }

    #[tokio::test]
    async fn test_drop_without_run_disposes_once() {
        let mut process = mock_process();
        process.expect_unsubscribe().times(1).return_const(());
        process.expect_dispose().times(1).return_const(());

        let runner = ProcessRunner::new(process, None, CancellationToken::new());
        assert_eq!(runner.state(), RunState::Created);
        drop(runner);
    }

    /// Mock whose start emits the given events and which never exits on its own
    fn emitting_process(events: Vec<ProcessEvent>) -> MockProcess {
        emitting_process_then_cancel(events, None)
    }

    /// Like [`emitting_process`], canceling `token` once the events are sent
    fn emitting_process_then_cancel(
        events: Vec<ProcessEvent>,
        token: Option<CancellationToken>,
    ) -> MockProcess {
        let mut process = mock_process();
        let subscription = Arc::new(Mutex::new(None::<Subscription>));

        let slot = subscription.clone();
        process
            .expect_subscribe()
            .times(1)
            .returning(move |s| *slot.lock().unwrap() = Some(s));
        process.expect_configure().return_const(());
        let slot = subscription.clone();
        process.expect_start().times(1).returning(move || {
            if let Some(subscription) = slot.lock().unwrap().as_ref() {
                for event in events.clone() {
                    subscription.emit(event);
                }
            }
            if let Some(token) = &token {
                token.cancel();
            }
            Ok(())
        });
        process.expect_unsubscribe().times(1).return_const(());
        process.expect_dispose().times(1).return_const(());
        process
    }

    #[tokio::test]
    async fn test_timeout_kills_once() {
        let mut process = emitting_process(vec![ProcessEvent::Chunk(
            Stream::Stdout,
            "partial".to_string(),
        )]);
        process.expect_has_exited().return_const(false);
        process.expect_kill().times(1).returning(|| Ok(()));

        let runner = ProcessRunner::new(
            process,
            Some(Duration::from_millis(50)),
            CancellationToken::new(),
        );
        let err = runner.run_async().await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Canceled {
                reason: CancelReason::Timeout
            }
        ));
    }

    #[tokio::test]
    async fn test_kill_failure_wins_over_cancel() {
        let mut process = emitting_process(Vec::new());
        process.expect_has_exited().return_const(false);
        process
            .expect_kill()
            .times(1)
            .returning(|| Err(io::Error::from_raw_os_error(1)));

        let runner = ProcessRunner::new(process, Some(Duration::ZERO), CancellationToken::new());
        let err = runner.run_async().await.unwrap_err();

        match err {
            RunError::Kill(source) => assert_eq!(source.raw_os_error(), Some(1)),
            other => panic!("Expected kill error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exited_process_is_not_killed() {
        let mut process = emitting_process(Vec::new());
        process.expect_has_exited().return_const(true);
        process.expect_kill().never();

        let runner = ProcessRunner::new(process, Some(Duration::ZERO), CancellationToken::new());
        let err = runner.run_async().await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Canceled {
                reason: CancelReason::Timeout
            }
        ));
    }

    #[tokio::test]
    async fn test_success_with_nonzero_exit() {
        let mut process = emitting_process(vec![
            ProcessEvent::Chunk(Stream::Stdout, "done".to_string()),
            ProcessEvent::Exited { code: Some(2) },
            ProcessEvent::End(Stream::Stdout),
            ProcessEvent::End(Stream::Stderr),
        ]);
        process.expect_exit_code().return_const(Some(2));
        process.expect_kill().never();

        let runner = ProcessRunner::new(process, None, CancellationToken::new());
        assert_eq!(runner.run_async().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_events_sent_before_cancel_keep_success() {
        let token = CancellationToken::new();
        let mut process = emitting_process_then_cancel(
            vec![
                ProcessEvent::Chunk(Stream::Stdout, "all done".to_string()),
                ProcessEvent::Exited { code: Some(0) },
                ProcessEvent::End(Stream::Stdout),
                ProcessEvent::End(Stream::Stderr),
            ],
            Some(token.clone()),
        );
        process.expect_has_exited().return_const(true);
        process.expect_kill().never();

        let runner = ProcessRunner::new(process, None, token);
        assert_eq!(runner.run_async().await.unwrap(), "all done");
    }

    #[tokio::test]
    async fn test_cancel_with_exit_queued_is_not_killed() {
        let token = CancellationToken::new();
        let mut process = emitting_process_then_cancel(
            vec![
                ProcessEvent::Chunk(Stream::Stdout, "partial".to_string()),
                ProcessEvent::Exited { code: Some(0) },
            ],
            Some(token.clone()),
        );
        process.expect_has_exited().return_const(false);
        process.expect_kill().never();

        let runner = ProcessRunner::new(process, None, token);
        // Exit was already delivered, so the run waits for stream end
        let pending =
            tokio::time::timeout(Duration::from_millis(100), runner.run_async()).await;
        assert!(pending.is_err());
    }

    #[test]
    fn test_blocking_run_with_scripted_process() {
        let process = crate::process::ScriptedProcess::new().stdout("sync ").stdout("run");
        let probe = process.probe();

        let runner = ProcessRunner::new(process, Some(Duration::from_secs(5)), CancellationToken::new());
        assert_eq!(runner.run().unwrap(), "sync run");
        assert_eq!(probe.disposals(), 1);
        assert_eq!(probe.configured(), Some(Redirect::CAPTURE));
    }

    #[tokio::test]
    async fn test_blocking_run_inside_runtime_is_rejected() {
        let process = crate::process::ScriptedProcess::new();
        let probe = process.probe();

        let runner = ProcessRunner::new(process, None, CancellationToken::new());
        assert!(matches!(runner.run(), Err(RunError::Io(_))));
        assert!(!probe.started());
        assert_eq!(probe.disposals(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RunState::Started.to_string(), "started");
        assert_eq!(RunState::Canceled.to_string(), "canceled");
    }
}
