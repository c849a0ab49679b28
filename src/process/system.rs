//! OS process handle built on `tokio::process`
//!
//! Output is forwarded line by line (terminators kept) as it arrives, so
//! the captured text is the exact concatenation of what the process wrote.
//! A supervisor task owns the child: it records the exit status, emits the
//! exit notification, and services kill requests.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{ProcessDescriptor, ProcessEvent, ProcessHandle, Redirect, Stream, Subscription};

type KillReply = oneshot::Sender<io::Result<()>>;

/// Handle to a real OS process
pub struct SystemProcess {
    descriptor: ProcessDescriptor,
    redirect: Redirect,
    subscription: Option<Subscription>,
    status: Arc<Mutex<Option<ExitStatus>>>,
    kill_tx: Option<mpsc::UnboundedSender<KillReply>>,
    tasks: Vec<JoinHandle<()>>,
    pid: Option<u32>,
    disposed: bool,
}

impl SystemProcess {
    /// Create an unstarted handle for the descriptor
    pub fn new(descriptor: ProcessDescriptor) -> Self {
        Self {
            descriptor,
            redirect: Redirect::CAPTURE,
            subscription: None,
            status: Arc::new(Mutex::new(None)),
            kill_tx: None,
            tasks: Vec::new(),
            pid: None,
            disposed: false,
        }
    }

    /// The launch configuration
    pub fn descriptor(&self) -> &ProcessDescriptor {
        &self.descriptor
    }

    /// OS process id, once started
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    fn exit_status(&self) -> Option<ExitStatus> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emitter(&self) -> Subscription {
        self.subscription
            .clone()
            .unwrap_or_else(Subscription::detached)
    }
}

#[async_trait]
impl ProcessHandle for SystemProcess {
    fn subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.detach();
        }
    }

    fn configure(&mut self, redirect: Redirect) {
        self.redirect = redirect;
    }

    fn start(&mut self) -> io::Result<()> {
        if self.disposed {
            return Err(io::Error::other("process handle already disposed"));
        }
        if self.kill_tx.is_some() {
            return Err(io::Error::other("process already started"));
        }

        let mut cmd = self.descriptor.command()?;
        cmd.stdin(Stdio::null());
        cmd.stdout(redirected(self.redirect.stdout));
        cmd.stderr(redirected(self.redirect.stderr));
        cmd.kill_on_drop(true); // Kill process if the handle is dropped

        tracing::debug!("Spawning: {}", self.descriptor.command_line());

        let mut child = cmd.spawn()?;
        self.pid = child.id();

        let events = self.emitter();

        // Streams that are not captured end immediately
        match child.stdout.take() {
            Some(stdout) => self.tasks.push(tokio::spawn(forward_stream(
                stdout,
                Stream::Stdout,
                events.clone(),
            ))),
            None => {
                events.emit(ProcessEvent::End(Stream::Stdout));
            }
        }
        match child.stderr.take() {
            Some(stderr) => self.tasks.push(tokio::spawn(forward_stream(
                stderr,
                Stream::Stderr,
                events.clone(),
            ))),
            None => {
                events.emit(ProcessEvent::End(Stream::Stderr));
            }
        }

        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        self.kill_tx = Some(kill_tx);
        self.tasks.push(tokio::spawn(supervise(
            child,
            kill_rx,
            self.status.clone(),
            events,
        )));

        Ok(())
    }

    async fn kill(&mut self) -> io::Result<()> {
        if self.has_exited() {
            return Ok(());
        }

        let Some(kill_tx) = self.kill_tx.as_ref() else {
            return Err(io::Error::other("process not started"));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if kill_tx.send(reply_tx).is_err() {
            // Supervisor finished: the child was already reaped
            return Ok(());
        }

        reply_rx.await.unwrap_or(Ok(()))
    }

    fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_status().and_then(|status| status.code())
    }

    fn describe(&self) -> String {
        self.descriptor.command_line()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.unsubscribe();
        self.kill_tx = None;

        // Aborting the supervisor drops the child, which kills it if still running
        for task in self.tasks.drain(..) {
            task.abort();
        }

        tracing::trace!(pid = ?self.pid, "Process handle disposed");
    }
}

impl Drop for SystemProcess {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn redirected(capture: bool) -> Stdio {
    if capture {
        Stdio::piped()
    } else {
        Stdio::inherit()
    }
}

/// Own the child until it exits, servicing kill requests meanwhile
async fn supervise(
    mut child: Child,
    mut kill_rx: mpsc::UnboundedReceiver<KillReply>,
    status: Arc<Mutex<Option<ExitStatus>>>,
    events: Subscription,
) {
    loop {
        tokio::select! {
            result = child.wait() => {
                let code = match result {
                    Ok(exit) => {
                        *status.lock().unwrap_or_else(PoisonError::into_inner) = Some(exit);
                        exit.code()
                    }
                    Err(e) => {
                        tracing::warn!("Failed to wait for process: {}", e);
                        None
                    }
                };
                events.emit(ProcessEvent::Exited { code });
                break;
            }
            Some(reply) = kill_rx.recv() => {
                let _ = reply.send(child.start_kill());
            }
        }
    }
}

/// Forward a stream line by line until EOF, then signal its end
///
/// Keeps draining after the subscriber detaches so the child never blocks
/// on a full pipe.
async fn forward_stream<R: AsyncRead + Unpin>(reader: R, stream: Stream, events: Subscription) {
    let mut buf_reader = BufReader::new(reader);
    // Reuse line buffer across iterations
    let mut line = Vec::with_capacity(4096);

    loop {
        line.clear();
        match buf_reader.read_until(b'\n', &mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&line).into_owned();
                events.emit(ProcessEvent::Chunk(stream, chunk));
            }
            Err(e) => {
                tracing::warn!("Error reading {}: {}", stream, e);
                break;
            }
        }
    }

    events.emit(ProcessEvent::End(stream));
}
