//! Event pump: turns process events into signal resolutions
//!
//! Each stream buffer is append-only until its end marker; the end marker
//! resolves the stream's signal exactly once.

use tokio::sync::mpsc::UnboundedReceiver;

use super::signal::RunSignals;
use crate::error::RunError;
use crate::process::{ProcessEvent, Stream};

#[derive(Debug, Default)]
struct OutputBuffer {
    text: String,
    ended: bool,
}

impl OutputBuffer {
    fn append(&mut self, chunk: &str) {
        if !self.ended {
            self.text.push_str(chunk);
        }
    }

    /// Close the buffer; returns the text on the first call only
    fn finish(&mut self) -> Option<String> {
        if self.ended {
            return None;
        }
        self.ended = true;
        Some(std::mem::take(&mut self.text))
    }
}

/// Consumer of one handle's event stream
#[derive(Debug)]
pub(crate) struct EventPump {
    signals: RunSignals,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
}

impl EventPump {
    pub(crate) fn new(signals: RunSignals) -> Self {
        Self {
            signals,
            stdout: OutputBuffer::default(),
            stderr: OutputBuffer::default(),
        }
    }

    pub(crate) fn handle(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Chunk(Stream::Stdout, chunk) => self.stdout.append(&chunk),
            ProcessEvent::Chunk(Stream::Stderr, chunk) => self.stderr.append(&chunk),
            ProcessEvent::End(Stream::Stdout) => {
                if let Some(text) = self.stdout.finish() {
                    tracing::trace!(bytes = text.len(), "stdout closed");
                    self.signals.stdout.try_resolve(text);
                }
            }
            ProcessEvent::End(Stream::Stderr) => {
                if let Some(text) = self.stderr.finish() {
                    tracing::trace!(bytes = text.len(), "stderr closed");
                    if text.is_empty() {
                        self.signals.stderr.try_resolve(text);
                    } else {
                        self.signals.stderr.try_fail(RunError::process(&text));
                    }
                }
            }
            ProcessEvent::Exited { code } => {
                // Recorded only; stderr decides failure
                tracing::debug!(?code, "Process exited");
                self.signals.exited.try_resolve(code == Some(0));
            }
        }
    }

    /// Handle the events already queued, without waiting for more
    pub(crate) fn drain_queued(&mut self, events: &mut UnboundedReceiver<ProcessEvent>) {
        // Bounded by the queue length at entry so a chatty process cannot
        // keep the caller here
        for _ in 0..events.len() {
            match events.try_recv() {
                Ok(event) => self.handle(event),
                Err(_) => break,
            }
        }
    }
}
