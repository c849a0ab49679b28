//! One-shot completion signals
//!
//! A [`CompletionSignal`] starts pending and settles at most once, into a
//! value, a failure, or cancellation. Every settle operation is
//! "try": the first one wins and later attempts return `false`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::RunError;

/// Terminal state of a signal
#[derive(Debug)]
pub enum Settled<T> {
    Value(T),
    Failed(RunError),
    Canceled,
}

/// Observable state of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    Pending,
    Resolved,
    Failed,
    Canceled,
}

impl SignalStatus {
    pub fn is_settled(self) -> bool {
        self != SignalStatus::Pending
    }
}

#[derive(Debug)]
enum Slot<T> {
    Pending,
    Settled(Settled<T>),
    /// Payload moved out by `take`; the status is kept
    Taken(SignalStatus),
}

/// One-shot resolution cell
#[derive(Debug)]
pub struct CompletionSignal<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

impl<T> Default for CompletionSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompletionSignal<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_settle(&self, settled: Settled<T>) -> bool {
        {
            let mut cell = self.lock();
            if !matches!(*cell, Slot::Pending) {
                return false;
            }
            *cell = Slot::Settled(settled);
        }
        self.notify.notify_waiters();
        true
    }

    /// Resolve with a value if still pending
    pub fn try_resolve(&self, value: T) -> bool {
        self.try_settle(Settled::Value(value))
    }

    /// Fail if still pending
    pub fn try_fail(&self, error: RunError) -> bool {
        self.try_settle(Settled::Failed(error))
    }

    /// Cancel if still pending
    pub fn try_cancel(&self) -> bool {
        self.try_settle(Settled::Canceled)
    }

    pub fn status(&self) -> SignalStatus {
        match &*self.lock() {
            Slot::Pending => SignalStatus::Pending,
            Slot::Settled(Settled::Value(_)) => SignalStatus::Resolved,
            Slot::Settled(Settled::Failed(_)) => SignalStatus::Failed,
            Slot::Settled(Settled::Canceled) => SignalStatus::Canceled,
            Slot::Taken(status) => *status,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status().is_settled()
    }

    /// Wait until the signal leaves pending
    pub async fn settled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent settle is not missed
            notified.as_mut().enable();

            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    /// Move the settled payload out; `None` while pending or once taken
    pub fn take(&self) -> Option<Settled<T>> {
        let mut cell = self.lock();
        let status = match &*cell {
            Slot::Pending | Slot::Taken(_) => return None,
            Slot::Settled(Settled::Value(_)) => SignalStatus::Resolved,
            Slot::Settled(Settled::Failed(_)) => SignalStatus::Failed,
            Slot::Settled(Settled::Canceled) => SignalStatus::Canceled,
        };
        match std::mem::replace(&mut *cell, Slot::Taken(status)) {
            Slot::Settled(settled) => Some(settled),
            _ => None,
        }
    }
}

/// The three completion sources of one run
#[derive(Debug, Clone, Default)]
pub struct RunSignals {
    /// Process exit; `true` when the exit code was zero
    pub exited: Arc<CompletionSignal<bool>>,
    /// Full stdout text once the stream ended
    pub stdout: Arc<CompletionSignal<String>>,
    /// Empty string, or a process failure carrying stderr text
    pub stderr: Arc<CompletionSignal<String>>,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until all three signals are settled
    pub async fn all_settled(&self) {
        tokio::join!(
            self.exited.settled(),
            self.stdout.settled(),
            self.stderr.settled()
        );
    }

    pub fn all_are_settled(&self) -> bool {
        self.exited.is_settled() && self.stdout.is_settled() && self.stderr.is_settled()
    }

    /// Cancel every signal that is still pending
    pub fn cancel_pending(&self) {
        self.exited.try_cancel();
        self.stdout.try_cancel();
        self.stderr.try_cancel();
    }
}
