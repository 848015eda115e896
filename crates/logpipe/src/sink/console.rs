//! Console sink: immediate line-oriented output.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::Sink;
use crate::decode::LogRecord;

/// Sink that writes each record to stdout as it arrives, unbatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn consume(&self, mut records: mpsc::Receiver<LogRecord>) {
        while let Some(record) = records.recv().await {
            match serde_json::to_string(&record.fields) {
                Ok(json) => println!("[{}] {}", record.timestamp.to_rfc3339(), json),
                Err(e) => warn!(error = %e, "could not encode log record"),
            }
        }
    }
}
