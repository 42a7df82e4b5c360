use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::activity::ActivityBackend;
use crate::history::HistoryCache;
use crate::queue::{EventQueue, SchedulingEvent};

/// Executes cache misses out of band and re-arms the replay driver when
/// their outcomes land.
///
/// Each dispatched identifier runs on a detached task that executes the
/// backend, records the outcome in the history cache, and then enqueues a
/// `StartExecution` event. The cache write always happens before the
/// enqueue, so the attempt triggered by the event observes the outcome.
pub struct ActivityScheduler {
    backend: Arc<dyn ActivityBackend>,
    cache: Arc<HistoryCache>,
    queue: EventQueue,
    in_flight: Mutex<HashSet<String>>,
}

impl ActivityScheduler {
    pub fn new(backend: Arc<dyn ActivityBackend>, cache: Arc<HistoryCache>, queue: EventQueue) -> Arc<Self> {
        Arc::new(Self {
            backend,
            cache,
            queue,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Schedule one execution of `identifier` unless it is already in flight
    /// or its outcome is already recorded. Returns true iff this call
    /// started an execution.
    pub fn dispatch(self: &Arc<Self>, identifier: &str, input: Option<String>) -> bool {
        {
            let mut pending = self.in_flight.lock().unwrap();
            if pending.contains(identifier) {
                debug!(activity = %identifier, "dispatch suppressed; execution already in flight");
                return false;
            }
            // Re-check the cache under the in-flight lock: a completion that
            // raced the caller's lookup has already cleared its mark here,
            // so its outcome must be visible now.
            if self.cache.lookup(identifier).is_some() {
                debug!(activity = %identifier, "dispatch suppressed; outcome already recorded");
                return false;
            }
            pending.insert(identifier.to_string());
        }
        let this = self.clone();
        let name = identifier.to_string();
        tokio::spawn(async move {
            this.run_to_completion(name, input).await;
        });
        true
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    async fn run_to_completion(self: Arc<Self>, name: String, input: Option<String>) {
        debug!(activity = %name, "executing scheduled activity");
        let outcome = self.backend.execute(&name, input.as_deref()).await;
        match &outcome {
            Ok(result) => debug!(activity = %name, result = %result, "activity execution finished"),
            Err(error) => {
                warn!(activity = %name, error = %error, "activity execution failed; recording terminal outcome")
            }
        }
        self.cache.insert_if_absent(name.clone(), outcome);
        // Clear the mark only after the cache write; dispatch re-checks the
        // cache under the in-flight lock and must not miss both.
        self.in_flight.lock().unwrap().remove(&name);
        if let Err(e) = self.queue.enqueue(SchedulingEvent::StartExecution).await {
            warn!(activity = %name, error = %e, "could not re-arm replay driver; queue unavailable");
        }
    }
}
