#![allow(dead_code)]

use async_trait::async_trait;
use redrive::{ActivityBackend, CompletionReport, OutputSink};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Backend that counts executions per identifier and answers in the
/// fixed-delay simulator's result format after a per-identifier delay.
pub struct CountingBackend {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    counts: Mutex<HashMap<String, u64>>,
}

impl CountingBackend {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            delays: HashMap::new(),
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counts.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ActivityBackend for CountingBackend {
    async fn execute(&self, name: &str, input: Option<&str>) -> Result<String, String> {
        {
            let mut counts = self.counts.lock().unwrap();
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
        let delay = self.delays.get(name).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;
        Ok(format!("{}-Input-{}-COMPLETE", name, input.unwrap_or("N/A")))
    }
}

/// Sink that forwards every completion report to a channel for assertions.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CompletionReport>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompletionReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn report(&self, report: &CompletionReport) {
        let _ = self.tx.send(report.clone());
    }
}
