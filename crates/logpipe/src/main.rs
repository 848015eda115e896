//! logpipe CLI: one-shot delivery of compressed access logs from S3.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use logpipe::config::Config;
use logpipe::pipeline::LogPipeline;
use logpipe::sink::cloudwatch::CloudWatchLogsClient;
use logpipe::source::s3::S3ObjectStore;
use logpipe::{aws, init_tracing, sink};

/// Ship compressed access logs from S3 into the configured sinks.
#[derive(Debug, Parser)]
#[command(name = "logpipe", version, about)]
struct CliArgs {
    /// Path to the YAML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// S3 URL of the objects to process, e.g. s3://bucket/prefix.
    url: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let fields = match config.field_table() {
        Ok(table) => Arc::new(table),
        Err(e) => {
            eprintln!("Invalid field table: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sdk = aws::sdk_config(&config.aws).await;
    let store = Arc::new(S3ObjectStore::new(aws::s3_client(&config.aws, &sdk)));
    let telemetry = Arc::new(CloudWatchLogsClient::new(aws::logs_client(&sdk)));

    let sinks = match sink::build_sinks(&config, telemetry).await {
        Ok(sinks) => sinks,
        Err(e) => {
            eprintln!("Failed to initialize sinks: {e}");
            return ExitCode::FAILURE;
        }
    };

    for sink in &sinks {
        info!(sink = sink.name(), "sink initialized");
    }
    info!(sinks = sinks.len(), "starting logpipe");

    let pipeline = LogPipeline::new(store, sinks, fields);
    match pipeline.process_url(&args.url).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Processing failed: {e}");
            ExitCode::FAILURE
        }
    }
}
