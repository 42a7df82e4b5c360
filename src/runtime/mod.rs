use crate::activity::{ActivityBackend, FixedDelaySimulator};
use crate::context::OrchestrationContext;
use crate::history::HistoryCache;
use crate::queue::{EventQueue, EventReceiver, QueueError, SchedulingEvent};
use crate::scheduler::ActivityScheduler;
use crate::signal::RendezvousSignal;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub mod sink;

pub use sink::{CompletionReport, OutputSink, TracingSink};

/// Observable state of the single orchestration instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    /// No attempt has started yet.
    Idle,
    /// A replay attempt is executing.
    Running,
    /// The last attempt was abandoned; the driver is waiting for the next
    /// scheduling event.
    Suspended,
    Completed { output: String },
    Failed { error: String },
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceStatus::Completed { .. } | InstanceStatus::Failed { .. })
    }
}

/// Error type returned by `Runtime::wait_for_completion`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("timed out before a terminal status was reached")]
    Timeout,
}

/// Trait implemented by the orchestrator program driven by the runtime.
#[async_trait]
pub trait OrchestrationHandler: Send + Sync {
    async fn invoke(&self, ctx: OrchestrationContext, input: String) -> Result<String, String>;
}

/// Function wrapper that implements `OrchestrationHandler`.
pub struct FnOrchestration<F, Fut>(pub F)
where
    F: Fn(OrchestrationContext, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String, String>> + Send + 'static;

#[async_trait]
impl<F, Fut> OrchestrationHandler for FnOrchestration<F, Fut>
where
    F: Fn(OrchestrationContext, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String, String>> + Send + 'static,
{
    async fn invoke(&self, ctx: OrchestrationContext, input: String) -> Result<String, String> {
        (self.0)(ctx, input).await
    }
}

/// Tunables for the replay driver.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Capacity of the scheduling-event queue.
    pub queue_capacity: usize,
    /// How long an abandoned attempt gets to unwind cooperatively before
    /// the driver aborts its task.
    pub abandon_grace: Duration,
}

impl RuntimeOptions {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 3;
    pub const DEFAULT_ABANDON_GRACE_MS: u64 = 250;
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            abandon_grace: Duration::from_millis(Self::DEFAULT_ABANDON_GRACE_MS),
        }
    }
}

/// In-process replay driver for a single orchestration instance.
///
/// The runtime seeds the event queue with one `StartExecution`, then runs an
/// event loop: each consumed event spawns a fresh replay attempt of the
/// orchestrator and races it against the abandon signal. Abandoned attempts
/// are torn down cooperatively and suspend the instance; natural completions
/// are classified, reported to the output sink, and recorded as the
/// instance's terminal status (first terminal outcome wins).
pub struct Runtime {
    handler: Arc<dyn OrchestrationHandler>,
    input: String,
    context: OrchestrationContext,
    history: Arc<HistoryCache>,
    queue: EventQueue,
    abandon: Arc<RendezvousSignal>,
    teardown: Arc<RendezvousSignal>,
    sink: Arc<dyn OutputSink>,
    options: RuntimeOptions,
    status: Mutex<InstanceStatus>,
    attempts: AtomicU64,
    loop_join: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    /// Start a new runtime with default options, the fixed-delay activity
    /// backend, and the tracing output sink.
    pub async fn start(handler: Arc<dyn OrchestrationHandler>, input: impl Into<String>) -> Arc<Self> {
        Self::start_with(
            RuntimeOptions::default(),
            Arc::new(FixedDelaySimulator::default()),
            Arc::new(TracingSink),
            handler,
            input,
        )
        .await
    }

    /// Start a new runtime with explicit options, activity backend, and
    /// output sink.
    pub async fn start_with(
        options: RuntimeOptions,
        backend: Arc<dyn ActivityBackend>,
        sink: Arc<dyn OutputSink>,
        handler: Arc<dyn OrchestrationHandler>,
        input: impl Into<String>,
    ) -> Arc<Self> {
        // Install a default subscriber if none set (ok to call many times)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .try_init();

        // tokio's bounded channels reject zero capacity
        let capacity = options.queue_capacity.max(1);
        let (queue, receiver) = EventQueue::bounded(capacity);
        let history = Arc::new(HistoryCache::new());
        let scheduler = ActivityScheduler::new(backend, history.clone(), queue.clone());
        let abandon = Arc::new(RendezvousSignal::new());
        let teardown = Arc::new(RendezvousSignal::new());
        let context = OrchestrationContext::new(history.clone(), scheduler, abandon.clone(), teardown.clone());

        // Seed the first execution before the loop starts consuming; the
        // freshly created queue always has room for it.
        let _ = queue.try_enqueue(SchedulingEvent::StartExecution);
        debug!("seeded initial scheduling event");

        let runtime = Arc::new(Self {
            handler,
            input: input.into(),
            context,
            history,
            queue,
            abandon,
            teardown,
            sink,
            options,
            status: Mutex::new(InstanceStatus::Idle),
            attempts: AtomicU64::new(0),
            loop_join: Mutex::new(None),
        });

        let handle = runtime.clone().start_event_loop(receiver);
        *runtime.loop_join.lock().unwrap() = Some(handle);
        runtime
    }

    fn start_event_loop(self: Arc<Self>, mut events: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    SchedulingEvent::StartExecution => self.run_replay_attempt().await,
                }
            }
            debug!("event queue closed and drained; replay driver exiting");
        })
    }

    /// Run one replay attempt to its rendezvous outcome: abandoned or
    /// naturally complete.
    async fn run_replay_attempt(self: &Arc<Self>) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.status().is_terminal() {
            debug!(attempt, "replaying past a terminal status; loop keeps consuming");
        }
        // Stale edges from the previous attempt must not leak into this one.
        self.abandon.reset();
        self.teardown.reset();
        self.transition(InstanceStatus::Running);
        debug!(attempt, "starting replay attempt");

        let ctx = self.context.clone();
        let handler = self.handler.clone();
        let input = self.input.clone();
        let mut join = tokio::spawn(async move { handler.invoke(ctx, input).await });

        tokio::select! {
            biased;
            _ = self.abandon.wait() => {
                // Cooperative teardown: release the suspended invoker, give
                // the attempt a grace window to unwind, abort as backstop.
                self.teardown.set();
                match tokio::time::timeout(self.options.abandon_grace, &mut join).await {
                    Ok(_discarded) => {
                        debug!(attempt, "attempt abandoned; partial output discarded");
                    }
                    Err(_elapsed) => {
                        warn!(attempt, "abandoned attempt did not unwind within grace window; aborting task");
                        join.abort();
                    }
                }
                self.transition(InstanceStatus::Suspended);
            }
            joined = &mut join => {
                let report = match joined {
                    Ok(Ok(output)) => {
                        debug!(attempt, "attempt completed");
                        let terminal = InstanceStatus::Completed { output: output.clone() };
                        self.transition(terminal);
                        CompletionReport::Completed { attempt, output }
                    }
                    Ok(Err(error)) => {
                        debug!(attempt, error = %error, "attempt faulted");
                        let terminal = InstanceStatus::Failed { error: error.clone() };
                        self.transition(terminal);
                        CompletionReport::Failed { attempt, error }
                    }
                    Err(join_error) => {
                        let error = format!("attempt panicked: {}", join_error);
                        warn!(attempt, error = %error, "attempt task failed");
                        self.transition(InstanceStatus::Failed { error: error.clone() });
                        CompletionReport::Failed { attempt, error }
                    }
                };
                self.sink.report(&report).await;
            }
        }
    }

    /// Move to `next` unless a terminal status is already recorded; the
    /// first terminal outcome is sticky.
    fn transition(&self, next: InstanceStatus) {
        let mut status = self.status.lock().unwrap();
        if status.is_terminal() {
            return;
        }
        *status = next;
    }

    pub fn status(&self) -> InstanceStatus {
        self.status.lock().unwrap().clone()
    }

    /// Number of replay attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The memoized activity outcomes backing replay.
    pub fn history(&self) -> Arc<HistoryCache> {
        self.history.clone()
    }

    /// Inject an extra scheduling event into the running loop. Embedders use
    /// this to force a fresh replay attempt without waiting for a completion.
    pub async fn raise_event(&self, event: SchedulingEvent) -> Result<(), QueueError> {
        self.queue.enqueue(event).await
    }

    /// Wait until the instance reaches a terminal status (Completed/Failed)
    /// or the timeout elapses.
    pub async fn wait_for_completion(&self, timeout: Duration) -> Result<InstanceStatus, WaitError> {
        let deadline = std::time::Instant::now() + timeout;
        // quick path
        if let Some(terminal) = self.terminal_status() {
            return Ok(terminal);
        }
        // poll with backoff
        let mut delay_ms: u64 = 5;
        while std::time::Instant::now() < deadline {
            if let Some(terminal) = self.terminal_status() {
                return Ok(terminal);
            }
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            delay_ms = delay_ms.saturating_mul(2).min(100);
        }
        Err(WaitError::Timeout)
    }

    fn terminal_status(&self) -> Option<InstanceStatus> {
        let status = self.status.lock().unwrap();
        if status.is_terminal() { Some(status.clone()) } else { None }
    }

    /// Abort the event loop task. Activity executions already dispatched are
    /// never cancelled and may still record outcomes afterwards.
    pub async fn shutdown(self: Arc<Self>) {
        if let Some(join) = self.loop_join.lock().unwrap().take() {
            join.abort();
        }
    }
}
