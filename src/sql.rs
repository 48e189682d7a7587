//! Multi-row INSERT statement construction.
//!
//! Clone steps stage homogeneous record lists and commit each list with a
//! single INSERT. Columns come from the first record; every record is
//! expected to carry the same keys. Shape mismatches are not validated and
//! produce a statement with uneven row arity, which the database rejects.

use crate::error::{CloneError, CloneResult, ErrorCode};
use serde_json::{Map, Value};

/// A uniform-shape record destined for one table.
pub type InsertRecord = Map<String, Value>;

/// Render a JSON value as a SQL literal. Nulls are unquoted NULL, numbers
/// are emitted as-is, and everything else is stringified with single quotes
/// doubled and wrapped in quotes (objects and arrays stringify as JSON).
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// Build one INSERT statement covering all records.
pub fn build_bulk_insert(table: &str, records: &[InsertRecord]) -> CloneResult<String> {
    if records.is_empty() {
        return Err(CloneError::new(
            ErrorCode::EmptyInsert,
            format!("No records to insert into {}", table),
        ));
    }

    let columns: Vec<&String> = records[0].keys().collect();

    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            let values: Vec<String> = record.values().map(sql_literal).collect();
            format!("({})", values.join(", "))
        })
        .collect();

    Ok(format!(
        "INSERT INTO {} ({})\nVALUES {}",
        table,
        columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        rows.join(",\n       ")
    ))
}
