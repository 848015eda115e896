//! logpipe: ships compressed access-log objects from S3 to delivery sinks.
//!
//! This crate handles:
//! - Fetching gzip-compressed access-log objects from S3
//! - Streaming decompression with bounded memory
//! - Decoding space-delimited records and projecting configured fields
//! - Fanning decoded records out to every configured sink
//! - Batched delivery to CloudWatch Logs under size/count/latency bounds

pub mod aws;
pub mod config;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
mod trace;

// Re-export commonly used items
pub use config::Config;
pub use decode::LogRecord;
pub use error::{AggregateError, RunError};
pub use pipeline::LogPipeline;
pub use trace::init_tracing;
