use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Single-slot, edge-triggered rendezvous between a replay attempt and the
/// driver racing it.
///
/// The slot is sticky: once `set`, every `wait` resolves immediately until
/// `reset` clears it for the next attempt. Setting an already-set slot is a
/// no-op, and an edge raised before a waiter arrives is never lost.
///
/// The engine uses two of these per instance: one raised by the invoker to
/// declare the current attempt abandoned, and one raised by the driver to
/// tear the abandoned attempt down cooperatively.
pub struct RendezvousSignal {
    slot: AtomicBool,
    notify: Notify,
}

impl RendezvousSignal {
    pub fn new() -> Self {
        Self {
            slot: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Raise the edge. Idempotent, non-blocking, wakes every current waiter.
    pub fn set(&self) {
        self.slot.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Clear the slot so a stale edge from a previous attempt cannot leak
    /// into the next one.
    pub fn reset(&self) {
        self.slot.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.slot.load(Ordering::SeqCst)
    }

    /// Resolve once the slot is set, including when `set` happened before
    /// this call.
    pub async fn wait(&self) {
        loop {
            // Register interest before checking the slot; notify_waiters only
            // reaches waiters created before the edge.
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RendezvousSignal {
    fn default() -> Self {
        Self::new()
    }
}
