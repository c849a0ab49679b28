//! Composite cancellation: caller token plus optional timeout
//!
//! With a timeout the scope owns a child of the caller's token, canceled by
//! either the caller or a timer armed when the process starts. Without a
//! timeout the scope is the caller's token itself.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::CancelReason;

/// Map signed milliseconds onto a timeout budget
///
/// Negative disables the timeout; zero is an already-expired timeout.
pub fn timeout_from_millis(ms: i64) -> Option<Duration> {
    u64::try_from(ms).ok().map(Duration::from_millis)
}

/// Cancellation observed by one run
#[derive(Debug)]
pub struct CancellationScope {
    caller: CancellationToken,
    token: CancellationToken,
    budget: Option<Duration>,
    timer: Option<JoinHandle<()>>,
}

impl CancellationScope {
    pub fn new(caller: &CancellationToken, budget: Option<Duration>) -> Self {
        let token = match budget {
            Some(_) => caller.child_token(),
            None => caller.clone(),
        };

        Self {
            caller: caller.clone(),
            token,
            budget,
            timer: None,
        }
    }

    /// The enforced timeout, if any
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Start the timeout clock
    ///
    /// A zero budget cancels right away. Arming twice has no effect.
    pub fn arm(&mut self) {
        let Some(budget) = self.budget else {
            return;
        };
        if self.timer.is_some() || self.token.is_cancelled() {
            return;
        }

        if budget.is_zero() {
            tracing::debug!("Zero timeout, canceling immediately");
            self.token.cancel();
            return;
        }

        let token = self.token.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(budget) => {
                    tracing::debug!("Timeout of {:?} elapsed", budget);
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        }));
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is canceled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Who canceled: the caller wins when both fired
    pub fn reason(&self) -> CancelReason {
        if self.caller.is_cancelled() {
            CancelReason::Caller
        } else {
            CancelReason::Timeout
        }
    }

    /// Stop the timer; the caller's token is left untouched
    pub fn dispose(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for CancellationScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
