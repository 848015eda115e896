//! Delivery sinks for decoded log records.

pub mod batch;
pub mod cloudwatch;
pub mod console;

use std::sync::Arc;

use async_trait::async_trait;
use snafu::prelude::*;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::decode::LogRecord;
use crate::error::{ConfigError, NoUsableSinksSnafu};
use cloudwatch::{CloudWatchSink, TelemetryClient};
use console::ConsoleSink;

/// A delivery target for decoded log records.
///
/// Each object pipeline starts one worker per sink; the worker consumes its
/// record queue to completion, applying the sink's own buffering and flush
/// policy. Implementations need no knowledge of other variants.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Consume records until the queue closes.
    async fn consume(&self, records: mpsc::Receiver<LogRecord>);
}

/// Build the configured sinks.
///
/// Unknown sink kinds and sinks that fail to initialize are skipped with a
/// warning; zero usable sinks is an error.
pub async fn build_sinks(
    config: &Config,
    telemetry: Arc<dyn TelemetryClient>,
) -> Result<Vec<Arc<dyn Sink>>, ConfigError> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    for kind in &config.sinks {
        match kind.as_str() {
            "cloudwatch" => {
                let Some(cw) = &config.cloudwatch else {
                    warn!("skipping cloudwatch sink: no cloudwatch section in config");
                    continue;
                };
                match CloudWatchSink::new(
                    Arc::clone(&telemetry),
                    cw.log_group.clone(),
                    cw.log_stream.clone(),
                )
                .await
                {
                    Ok(sink) => sinks.push(Arc::new(sink)),
                    Err(e) => warn!(error = %e, "could not initialize cloudwatch sink"),
                }
            }
            "console" => sinks.push(Arc::new(ConsoleSink::new())),
            other => warn!(kind = other, "unsupported sink kind"),
        }
    }

    ensure!(!sinks.is_empty(), NoUsableSinksSnafu);
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::batch::LogEvent;
    use crate::error::DispatchError;

    struct NullTelemetry;

    #[async_trait]
    impl TelemetryClient for NullTelemetry {
        async fn put_events(
            &self,
            _group: &str,
            _stream: &str,
            _events: Vec<LogEvent>,
        ) -> Result<(), DispatchError> {
            Ok(())
        }

        async fn group_exists(&self, _group: &str) -> Result<bool, DispatchError> {
            Ok(true)
        }

        async fn create_group(&self, _group: &str) -> Result<(), DispatchError> {
            Ok(())
        }

        async fn stream_exists(&self, _group: &str, _stream: &str) -> Result<bool, DispatchError> {
            Ok(true)
        }

        async fn create_stream(&self, _group: &str, _stream: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn config(yaml: &str) -> Config {
        Config::parse(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_build_single_console_sink() {
        let config = config("sinks: [console]");
        let sinks = build_sinks(&config, Arc::new(NullTelemetry)).await.unwrap();

        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].name(), "console");
    }

    #[tokio::test]
    async fn test_build_cloudwatch_and_console() {
        let config = config(
            r#"
sinks: [cloudwatch, console]
cloudwatch:
  log_group: g
  log_stream: s
"#,
        );
        let sinks = build_sinks(&config, Arc::new(NullTelemetry)).await.unwrap();

        assert_eq!(sinks.len(), 2);
        assert_eq!(sinks[0].name(), "cloudwatch");
        assert_eq!(sinks[1].name(), "console");
    }

    #[tokio::test]
    async fn test_unknown_sink_kind_is_skipped() {
        let config = config("sinks: [console, carrier-pigeon]");
        let sinks = build_sinks(&config, Arc::new(NullTelemetry)).await.unwrap();

        assert_eq!(sinks.len(), 1);
    }

    #[tokio::test]
    async fn test_no_usable_sinks_is_an_error() {
        let config = config("sinks: [carrier-pigeon]");
        let err = build_sinks(&config, Arc::new(NullTelemetry))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ConfigError::NoUsableSinks));
    }

    #[tokio::test]
    async fn test_cloudwatch_without_section_is_skipped() {
        let config = config("sinks: [cloudwatch, console]");
        let sinks = build_sinks(&config, Arc::new(NullTelemetry)).await.unwrap();

        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].name(), "console");
    }
}
