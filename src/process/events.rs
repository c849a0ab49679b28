//! Detachable event subscription shared between a handle and its tasks

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::ProcessEvent;

/// Sending side of a process event stream
///
/// Clones share one slot, so [`detach`](Subscription::detach) silences every
/// task still holding a clone.
#[derive(Debug, Clone)]
pub struct Subscription {
    slot: Arc<Mutex<Option<UnboundedSender<ProcessEvent>>>>,
}

impl Subscription {
    /// Create a subscription and the receiver its events arrive on
    pub fn channel() -> (Self, UnboundedReceiver<ProcessEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (subscription, rx)
    }

    /// A subscription that drops every event
    pub fn detached() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver an event; returns `false` once detached or the receiver is gone
    pub fn emit(&self, event: ProcessEvent) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Stop delivering events
    pub fn detach(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Whether events are still delivered
    pub fn is_attached(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
