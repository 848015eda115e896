//! Field projection table for raw access-log columns.

use snafu::prelude::*;

use crate::error::{ConfigError, EmptyFieldTableSnafu, MissingTimestampFieldSnafu};

/// One column of the raw record: its output name and include policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub include: bool,
}

/// Ordered projection table over the raw columns.
///
/// The table length defines the expected column count of every raw record;
/// records with a different count are rejected. The timestamp column is
/// resolved once, by name, at construction.
#[derive(Debug, Clone)]
pub struct FieldTable {
    specs: Vec<FieldSpec>,
    timestamp_index: usize,
}

impl FieldTable {
    /// Build a table, resolving the timestamp column by name.
    ///
    /// The timestamp column must exist and be included.
    pub fn new(specs: Vec<FieldSpec>, timestamp_field: &str) -> Result<Self, ConfigError> {
        ensure!(!specs.is_empty(), EmptyFieldTableSnafu);
        let timestamp_index = specs
            .iter()
            .position(|spec| spec.name == timestamp_field && spec.include)
            .context(MissingTimestampFieldSnafu {
                name: timestamp_field,
            })?;
        Ok(Self {
            specs,
            timestamp_index,
        })
    }

    /// Expected column count of a raw record.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Index of the timestamp column.
    pub fn timestamp_index(&self) -> usize {
        self.timestamp_index
    }

    /// Whether the column at `index` is projected into decoded records.
    pub fn include(&self, index: usize) -> bool {
        self.specs[index].include
    }

    /// Output name of the column at `index`.
    pub fn name(&self, index: usize) -> &str {
        &self.specs[index].name
    }
}

/// The ALB access-log columns, in wire order.
pub fn alb_columns() -> Vec<FieldSpec> {
    const NAMES: [&str; 29] = [
        "type",
        "time",
        "elb",
        "client_port",
        "target_port",
        "request_processing_time",
        "target_processing_time",
        "response_processing_time",
        "elb_status_code",
        "target_status_code",
        "received_bytes",
        "sent_bytes",
        "request",
        "user_agent",
        "ssl_cipher",
        "ssl_protocol",
        "target_group_arn",
        "trace_id",
        "domain_name",
        "chosen_cert_arn",
        "matched_rule_priority",
        "request_creation_time",
        "actions_executed",
        "redirect_url",
        "error_reason",
        "target_port_list",
        "target_status_code_list",
        "classification",
        "classification_reason",
    ];
    NAMES
        .iter()
        .map(|name| FieldSpec {
            name: (*name).to_string(),
            include: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, include: bool) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            include,
        }
    }

    #[test]
    fn test_default_alb_table() {
        let table = FieldTable::new(alb_columns(), "time").unwrap();
        assert_eq!(table.len(), 29);
        assert_eq!(table.timestamp_index(), 1);
        assert_eq!(table.name(0), "type");
        assert_eq!(table.name(28), "classification_reason");
        assert!(table.include(12));
    }

    #[test]
    fn test_timestamp_resolved_by_name() {
        let table = FieldTable::new(
            vec![spec("method", true), spec("when", true), spec("path", false)],
            "when",
        )
        .unwrap();
        assert_eq!(table.timestamp_index(), 1);
        assert_eq!(table.len(), 3);
        assert!(!table.include(2));
    }

    #[test]
    fn test_missing_timestamp_field_is_rejected() {
        let err = FieldTable::new(vec![spec("method", true)], "time").unwrap_err();
        assert!(matches!(err, ConfigError::MissingTimestampField { .. }));
    }

    #[test]
    fn test_excluded_timestamp_field_is_rejected() {
        let err = FieldTable::new(vec![spec("time", false)], "time").unwrap_err();
        assert!(matches!(err, ConfigError::MissingTimestampField { .. }));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let err = FieldTable::new(Vec::new(), "time").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFieldTable));
    }
}
