use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Append-only memo of activity outcomes keyed by activity identifier.
///
/// An entry is written exactly once and never updated or removed; a replay
/// attempt that finds its identifier here returns the recorded outcome
/// without touching the backend. Failed executions are recorded too, as the
/// activity's terminal outcome.
pub struct HistoryCache {
    entries: Mutex<HashMap<String, Result<String, String>>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the recorded outcome for `identifier`, if any.
    pub fn lookup(&self, identifier: &str) -> Option<Result<String, String>> {
        self.entries.lock().unwrap().get(identifier).cloned()
    }

    /// Record an outcome unless one already exists. Returns true iff this
    /// call performed the insert; a lost race keeps the first writer's value.
    pub fn insert_if_absent(&self, identifier: impl Into<String>, outcome: Result<String, String>) -> bool {
        let identifier = identifier.into();
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&identifier) {
            debug!(activity = %identifier, "duplicate outcome ignored; first recorded outcome kept");
            return false;
        }
        entries.insert(identifier, outcome);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new()
    }
}
