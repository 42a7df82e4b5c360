use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Events consumed by the replay driver. Each one re-arms the loop for a
/// fresh replay attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchedulingEvent {
    /// Begin (or re-begin) executing the orchestrator from the top.
    StartExecution,
}

/// Error type for the producer side of the event queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue is full")]
    Full,
    #[error("event queue is closed")]
    Closed,
}

/// Producer handle for the bounded scheduling-event queue. Cheap to clone;
/// one lives in the activity scheduler, one in the runtime for external
/// event injection.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<SchedulingEvent>,
}

/// Consumer side of the queue, owned by the replay driver.
pub struct EventReceiver {
    rx: mpsc::Receiver<SchedulingEvent>,
}

impl EventQueue {
    /// Create a bounded FIFO queue and split it into producer and consumer
    /// halves.
    pub fn bounded(capacity: usize) -> (EventQueue, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (EventQueue { tx }, EventReceiver { rx })
    }

    /// Enqueue an event, waiting for capacity when the queue is full.
    /// Saturation applies backpressure rather than dropping the event; a
    /// dropped wake-up would strand a suspended instance.
    pub async fn enqueue(&self, event: SchedulingEvent) -> Result<(), QueueError> {
        self.tx.send(event).await.map_err(|_| QueueError::Closed)
    }

    /// Non-blocking variant for callers that prefer rejection over waiting.
    pub fn try_enqueue(&self, event: SchedulingEvent) -> Result<(), QueueError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl EventReceiver {
    /// Await the next event in FIFO order. Suspends while the queue is
    /// empty; returns `None` once the queue is closed and drained.
    pub async fn next(&mut self) -> Option<SchedulingEvent> {
        self.rx.recv().await
    }

    /// Mark the queue complete: further enqueues are refused, events already
    /// buffered are still delivered, then `next` returns `None`.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
