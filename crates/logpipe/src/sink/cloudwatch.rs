//! CloudWatch Logs sink.
//!
//! Batches records under the put-events size/count ceilings, with a periodic
//! flush bounding delivery latency during low-volume periods. Batches are
//! dispatched in chronological order; dispatch failures are logged and the
//! batch is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::Sink;
use super::batch::{LogEvent, PendingBatch, event_size};
use crate::decode::LogRecord;
use crate::error::{DispatchError, EnsureGroupSnafu, EnsureStreamSnafu, SinkError};

/// How often a non-empty batch is flushed regardless of size.
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Write access to the telemetry backend.
///
/// `put_events` implementations must reject batches that violate the
/// documented ceilings ([`super::batch::MAX_BATCH_BYTES`],
/// [`super::batch::MAX_BATCH_COUNT`]); the accumulator relies on the backend
/// keeping those limits honest.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
    ) -> Result<(), DispatchError>;

    async fn group_exists(&self, group: &str) -> Result<bool, DispatchError>;

    async fn create_group(&self, group: &str) -> Result<(), DispatchError>;

    async fn stream_exists(&self, group: &str, stream: &str) -> Result<bool, DispatchError>;

    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), DispatchError>;
}

/// Sink that batches records into CloudWatch Logs put-events calls.
pub struct CloudWatchSink {
    client: Arc<dyn TelemetryClient>,
    log_group: String,
    log_stream: String,
}

impl CloudWatchSink {
    /// Create the sink, ensuring the log group and stream exist.
    pub async fn new(
        client: Arc<dyn TelemetryClient>,
        log_group: String,
        log_stream: String,
    ) -> Result<Self, SinkError> {
        ensure_group_exists(client.as_ref(), &log_group).await?;
        ensure_stream_exists(client.as_ref(), &log_group, &log_stream).await?;
        Ok(Self {
            client,
            log_group,
            log_stream,
        })
    }

    async fn dispatch(&self, events: Vec<LogEvent>) {
        if let Err(e) = self
            .client
            .put_events(&self.log_group, &self.log_stream, events)
            .await
        {
            error!(
                group = %self.log_group,
                stream = %self.log_stream,
                error = %e,
                "failed to send batch, dropping it"
            );
        }
    }
}

async fn ensure_group_exists(client: &dyn TelemetryClient, group: &str) -> Result<(), SinkError> {
    if client
        .group_exists(group)
        .await
        .context(EnsureGroupSnafu { group })?
    {
        return Ok(());
    }
    info!(group, "creating log group");
    client
        .create_group(group)
        .await
        .context(EnsureGroupSnafu { group })
}

async fn ensure_stream_exists(
    client: &dyn TelemetryClient,
    group: &str,
    stream: &str,
) -> Result<(), SinkError> {
    if client
        .stream_exists(group, stream)
        .await
        .context(EnsureStreamSnafu { group, stream })?
    {
        return Ok(());
    }
    info!(group, stream, "creating log stream");
    client
        .create_stream(group, stream)
        .await
        .context(EnsureStreamSnafu { group, stream })
}

#[async_trait]
impl Sink for CloudWatchSink {
    fn name(&self) -> &'static str {
        "cloudwatch"
    }

    async fn consume(&self, mut records: mpsc::Receiver<LogRecord>) {
        let mut batch = PendingBatch::new();
        let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                received = records.recv() => match received {
                    Some(record) => {
                        let message = match serde_json::to_string(&record.fields) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!(error = %e, "could not encode log record, skipping");
                                continue;
                            }
                        };
                        let event = LogEvent {
                            message,
                            timestamp_millis: record.timestamp.timestamp_millis(),
                        };
                        if batch.would_exceed(event_size(&event)) {
                            let events = batch.take();
                            self.dispatch(events).await;
                        }
                        batch.push(event);
                    }
                    None => {
                        // Queue closed: final flush, then terminate.
                        if !batch.is_empty() {
                            let events = batch.take();
                            self.dispatch(events).await;
                        }
                        return;
                    }
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        let events = batch.take();
                        self.dispatch(events).await;
                    }
                }
            }
        }
    }
}

/// Live backend over the AWS CloudWatch Logs API.
pub struct CloudWatchLogsClient {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogsClient {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

fn dispatch_error(e: impl std::fmt::Display) -> DispatchError {
    DispatchError {
        message: e.to_string(),
    }
}

#[async_trait]
impl TelemetryClient for CloudWatchLogsClient {
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
    ) -> Result<(), DispatchError> {
        let events = events
            .into_iter()
            .map(|event| {
                aws_sdk_cloudwatchlogs::types::InputLogEvent::builder()
                    .message(event.message)
                    .timestamp(event.timestamp_millis)
                    .build()
                    .map_err(dispatch_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_log_events(Some(events))
            .send()
            .await
            .map_err(|e| dispatch_error(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)))?;

        Ok(())
    }

    async fn group_exists(&self, group: &str) -> Result<bool, DispatchError> {
        let response = self
            .client
            .describe_log_groups()
            .log_group_name_prefix(group)
            .send()
            .await
            .map_err(|e| dispatch_error(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)))?;

        Ok(response
            .log_groups()
            .iter()
            .any(|g| g.log_group_name() == Some(group)))
    }

    async fn create_group(&self, group: &str) -> Result<(), DispatchError> {
        self.client
            .create_log_group()
            .log_group_name(group)
            .send()
            .await
            .map_err(|e| dispatch_error(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn stream_exists(&self, group: &str, stream: &str) -> Result<bool, DispatchError> {
        let response = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .log_stream_name_prefix(stream)
            .send()
            .await
            .map_err(|e| dispatch_error(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)))?;

        Ok(response
            .log_streams()
            .iter()
            .any(|s| s.log_stream_name() == Some(stream)))
    }

    async fn create_stream(&self, group: &str, stream: &str) -> Result<(), DispatchError> {
        self.client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
            .map_err(|e| dispatch_error(aws_sdk_cloudwatchlogs::error::DisplayErrorContext(e)))?;
        Ok(())
    }
}
