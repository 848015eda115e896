//! Configuration for the logpipe log shipper.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::decode::fields::{FieldSpec, FieldTable, alb_columns};
use crate::error::{ConfigError, NoSinksSnafu, ReadFileSnafu, YamlParseSnafu};

/// CloudWatch Logs delivery target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudWatchConfig {
    /// Name of the log group to deliver into.
    pub log_group: String,
    /// Name of the log stream within the group.
    pub log_stream: String,
}

/// Overrides for AWS client construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region.
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack).
    pub endpoint: Option<String>,
}

/// One raw-record column: its output name and whether it is projected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Output name of the column.
    pub name: String,
    /// Whether the column is kept in decoded records.
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

fn default_sinks() -> Vec<String> {
    vec!["console".to_string()]
}

fn default_timestamp_field() -> String {
    "time".to_string()
}

/// Main configuration, resolved once at startup and passed into every
/// component as an immutable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sink kinds receiving decoded records (`cloudwatch`, `console`).
    #[serde(default = "default_sinks")]
    pub sinks: Vec<String>,
    /// CloudWatch Logs target, required when the `cloudwatch` sink is used.
    #[serde(default)]
    pub cloudwatch: Option<CloudWatchConfig>,
    /// AWS client overrides.
    #[serde(default)]
    pub aws: AwsConfig,
    /// Raw-record column table. Defaults to the ALB access-log columns.
    #[serde(default)]
    pub fields: Option<Vec<FieldConfig>>,
    /// Name of the column carrying the record timestamp.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sinks: default_sinks(),
            cloudwatch: None,
            aws: AwsConfig::default(),
            fields: None,
            timestamp_field: default_timestamp_field(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.sinks.is_empty(), NoSinksSnafu);
        self.field_table()?;
        Ok(())
    }

    /// Resolve the configured field table.
    pub fn field_table(&self) -> Result<FieldTable, ConfigError> {
        let specs = match &self.fields {
            Some(fields) => fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.name.clone(),
                    include: f.include,
                })
                .collect(),
            None => alb_columns(),
        };
        FieldTable::new(specs, &self.timestamp_field)
    }
}
