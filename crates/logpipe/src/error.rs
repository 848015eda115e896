//! Error types for the logpipe delivery pipeline.

use std::fmt;

use snafu::prelude::*;

use crate::source::SourceObject;

/// Errors loading or validating configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read the config file.
    #[snafu(display("Failed to read config file {path}: {source}"))]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse the config file.
    #[snafu(display("Failed to parse config: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// No sinks were configured.
    #[snafu(display("No sinks configured"))]
    NoSinks,

    /// Every configured sink failed to initialize or was unknown.
    #[snafu(display("No usable sinks could be initialized"))]
    NoUsableSinks,

    /// The field table has no columns.
    #[snafu(display("Field table is empty"))]
    EmptyFieldTable,

    /// The timestamp column is missing or excluded from the field table.
    #[snafu(display("Field table has no included column named {name:?} for the timestamp"))]
    MissingTimestampField { name: String },
}

/// Errors fetching or listing source objects.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    /// Failed to get an object.
    #[snafu(display("Failed to get s3://{bucket}/{key}: {message}"))]
    GetObject {
        bucket: String,
        key: String,
        message: String,
    },

    /// Failed to read an object's body stream.
    #[snafu(display("Failed to read body of s3://{bucket}/{key}: {message}"))]
    ReadBody {
        bucket: String,
        key: String,
        message: String,
    },

    /// Failed to list objects under a prefix.
    #[snafu(display("Failed to list s3://{bucket}/{prefix}: {message}"))]
    ListObjects {
        bucket: String,
        prefix: String,
        message: String,
    },

    /// The S3 URL does not start with `s3://`.
    #[snafu(display("Invalid S3 URL {url:?}: missing 's3://' prefix"))]
    UrlScheme { url: String },

    /// The S3 URL has no key portion after the bucket name.
    #[snafu(display("Invalid S3 URL {url:?}: no '/' found after bucket name"))]
    UrlNoKey { url: String },
}

/// Errors decoding raw records from the decompressed stream.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DecodeError {
    /// Failed to read from the decompressed stream.
    #[snafu(display("Failed to read decompressed stream: {source}"))]
    Read { source: std::io::Error },

    /// A raw record had the wrong number of columns.
    #[snafu(display(
        "Invalid log format at line {line}: expected {expected} fields, got {found}"
    ))]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The timestamp column failed to parse.
    #[snafu(display("Invalid timestamp at line {line}: {source}"))]
    Timestamp {
        line: usize,
        source: chrono::ParseError,
    },

    /// A quoted field was malformed (unterminated, or followed by junk).
    #[snafu(display("Malformed quoted field at line {line}"))]
    Quote { line: usize },
}

/// A telemetry backend rejected or failed a delivery call.
#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
#[snafu(visibility(pub))]
pub struct DispatchError {
    pub message: String,
}

/// Errors initializing a sink against its backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to ensure the log group exists.
    #[snafu(display("Failed to ensure log group {group} exists: {source}"))]
    EnsureGroup {
        group: String,
        source: DispatchError,
    },

    /// Failed to ensure the log stream exists.
    #[snafu(display("Failed to ensure log stream {stream} in group {group} exists: {source}"))]
    EnsureStream {
        group: String,
        stream: String,
        source: DispatchError,
    },
}

/// Failure of a single object's pipeline, tagged with the failing stage.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ObjectError {
    /// The object could not be fetched.
    #[snafu(display("fetch failed: {source}"))]
    Fetch { source: FetchError },

    /// The compressed stream was corrupt or truncated.
    #[snafu(display("decompression failed: {source}"))]
    Decompress { source: std::io::Error },

    /// A raw record could not be decoded.
    #[snafu(display("decode failed: {source}"))]
    Decode { source: DecodeError },

    /// The decode task died before producing a result.
    #[snafu(display("decode task failed: {source}"))]
    Task { source: tokio::task::JoinError },
}

/// One object's failure together with the object identity.
#[derive(Debug, Snafu)]
#[snafu(display("error processing logs for {object}: {source}"))]
#[snafu(visibility(pub))]
pub struct ObjectFailure {
    pub object: SourceObject,
    pub source: ObjectError,
}

/// Aggregate of every per-object failure from one scheduler run.
#[derive(Debug)]
pub struct AggregateError {
    failures: Vec<ObjectFailure>,
}

impl AggregateError {
    pub fn new(failures: Vec<ObjectFailure>) -> Self {
        Self { failures }
    }

    /// The individual per-object failures.
    pub fn failures(&self) -> &[ObjectFailure] {
        &self.failures
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} object(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Top-level errors from a pipeline run entry point.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    /// Listing the source location failed before any object was processed.
    #[snafu(display("Failed to list source objects: {source}"))]
    List { source: FetchError },

    /// One or more objects failed to process.
    #[snafu(display("{source}"))]
    Aggregate { source: AggregateError },
}
