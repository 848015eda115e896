//! Record decoding and field projection.
//!
//! Raw records are single lines of space-delimited fields; a field wrapped in
//! double quotes may contain embedded spaces, with `""` escaping a literal
//! quote. Decoding validates the column count against the field table, parses
//! the timestamp column, projects the included columns, and streams each
//! decoded record to every sink queue in input order.

pub mod fields;

use std::collections::HashMap;
use std::io::BufRead;

use chrono::{DateTime, Utc};
use snafu::prelude::*;
use tokio::sync::mpsc;

use crate::error::{ColumnCountSnafu, DecodeError, QuoteSnafu, ReadSnafu, TimestampSnafu};
use fields::FieldTable;

/// One decoded access-log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub fields: HashMap<String, String>,
}

/// Read records from `reader` until end of stream, pushing each decoded
/// record to every sink queue in input order.
///
/// Pushing blocks while a queue is full; that is the pipeline's backpressure
/// mechanism, so this must run on the blocking pool. Any malformed record
/// fails the whole stream. Returns the number of records decoded.
pub fn decode_records<R: BufRead>(
    reader: R,
    table: &FieldTable,
    queues: &[mpsc::Sender<LogRecord>],
) -> Result<usize, DecodeError> {
    let mut count = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.context(ReadSnafu)?;
        if line.is_empty() {
            continue;
        }
        let record = decode_line(&line, table, index + 1)?;
        for queue in queues {
            // A send only fails if the worker died; there is nothing left to
            // deliver there, the remaining queues still get the record.
            let _ = queue.blocking_send(record.clone());
        }
        count += 1;
    }
    Ok(count)
}

/// Decode one raw line into a [`LogRecord`].
pub fn decode_line(
    line: &str,
    table: &FieldTable,
    line_no: usize,
) -> Result<LogRecord, DecodeError> {
    let raw = split_fields(line, line_no)?;
    ensure!(
        raw.len() == table.len(),
        ColumnCountSnafu {
            line: line_no,
            expected: table.len(),
            found: raw.len(),
        }
    );

    let timestamp = DateTime::parse_from_rfc3339(&raw[table.timestamp_index()])
        .context(TimestampSnafu { line: line_no })?
        .with_timezone(&Utc);

    let mut projected = HashMap::new();
    for (index, value) in raw.into_iter().enumerate() {
        if table.include(index) {
            projected.insert(table.name(index).to_string(), value);
        }
    }

    Ok(LogRecord {
        timestamp,
        fields: projected,
    })
}

/// Split one raw line into fields on single spaces, honoring double-quoted
/// fields with `""` escapes.
fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>, DecodeError> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        let mut field = String::new();

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    field.push(c);
                }
            }
            ensure!(closed, QuoteSnafu { line: line_no });
        } else {
            while let Some(&c) = chars.peek() {
                if c == ' ' {
                    break;
                }
                field.push(c);
                chars.next();
            }
        }

        fields.push(field);

        match chars.next() {
            Some(' ') => {}
            None => break,
            // Anything other than a delimiter after a closing quote.
            Some(_) => return QuoteSnafu { line: line_no }.fail(),
        }
    }

    Ok(fields)
}
