use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What the driver hands to the output sink when a replay attempt finishes
/// naturally. Abandoned attempts produce no report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionReport {
    Completed { attempt: u64, output: String },
    Failed { attempt: u64, error: String },
}

impl CompletionReport {
    pub fn attempt(&self) -> u64 {
        match self {
            CompletionReport::Completed { attempt, .. } => *attempt,
            CompletionReport::Failed { attempt, .. } => *attempt,
        }
    }
}

/// Destination for natural completions. The driver reports every one, even
/// those arriving after a terminal status has already been recorded.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn report(&self, report: &CompletionReport);
}

/// Default sink: one structured log line per completion.
pub struct TracingSink;

#[async_trait]
impl OutputSink for TracingSink {
    async fn report(&self, report: &CompletionReport) {
        match report {
            CompletionReport::Completed { attempt, output } => {
                info!(attempt = *attempt, output = %output, "orchestration result");
            }
            CompletionReport::Failed { attempt, error } => {
                warn!(attempt = *attempt, error = %error, "orchestration failed");
            }
        }
    }
}
