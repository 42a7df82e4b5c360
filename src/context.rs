use std::sync::Arc;
use tracing::debug;

use crate::_typed_codec::{Codec, Json};
use crate::history::HistoryCache;
use crate::scheduler::ActivityScheduler;
use crate::signal::RendezvousSignal;

/// User-facing handle threaded into every replay attempt. All activity
/// invocations go through here; the context decides between replaying a
/// recorded outcome and scheduling fresh work.
///
/// One context exists per runtime and is shared by all attempts; it is
/// cheap to clone and never reachable through globals.
#[derive(Clone)]
pub struct OrchestrationContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cache: Arc<HistoryCache>,
    scheduler: Arc<ActivityScheduler>,
    abandon: Arc<RendezvousSignal>,
    teardown: Arc<RendezvousSignal>,
}

impl OrchestrationContext {
    pub(crate) fn new(
        cache: Arc<HistoryCache>,
        scheduler: Arc<ActivityScheduler>,
        abandon: Arc<RendezvousSignal>,
        teardown: Arc<RendezvousSignal>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cache,
                scheduler,
                abandon,
                teardown,
            }),
        }
    }

    /// Invoke an activity by identifier.
    ///
    /// A recorded outcome replays immediately, success or failure alike.
    /// On a miss the invocation is scheduled (deduplicated against work
    /// already in flight), the current attempt is declared abandoned, and
    /// this call suspends until the driver tears the attempt down; it then
    /// returns an `abandoned:` error that unwinds the orchestrator through
    /// `?`. The next attempt, triggered by the completion, replays the
    /// recorded outcome instead.
    pub async fn invoke(&self, identifier: impl Into<String>, input: Option<String>) -> Result<String, String> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err("empty activity identifier".to_string());
        }
        if let Some(outcome) = self.inner.cache.lookup(&identifier) {
            debug!(activity = %identifier, "replaying recorded outcome");
            return outcome;
        }
        if self.inner.scheduler.dispatch(&identifier, input) {
            debug!(activity = %identifier, "no recorded outcome; scheduled execution, abandoning attempt");
        } else {
            debug!(activity = %identifier, "no recorded outcome; execution pending, abandoning attempt");
        }
        self.inner.abandon.set();
        self.inner.teardown.wait().await;
        Err(format!("abandoned: awaiting completion of {}", identifier))
    }

    /// Typed wrapper around `invoke`: the input is JSON-encoded into the
    /// invocation payload and the recorded outcome decoded on the way out.
    pub async fn invoke_typed<In, Out>(&self, identifier: impl Into<String>, input: &In) -> Result<Out, String>
    where
        In: serde::Serialize,
        Out: serde::de::DeserializeOwned,
    {
        let payload = Json::encode(input)?;
        let raw = self.invoke(identifier, Some(payload)).await?;
        Json::decode::<Out>(&raw)
    }

    /// Number of recorded outcomes visible to this context.
    pub fn history_len(&self) -> usize {
        self.inner.cache.len()
    }
}
