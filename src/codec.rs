//! Row codec: bidirectional marshaling between engine storage types and the
//! logical row model (§4.2).

use crate::schema::column::ColumnKind;
use crate::schema::table::Table;
use crate::value::{millis_to_datetime, LogicalValue, Row};
use rusqlite::types::ValueRef;
use rusqlite::Row as SqlRow;

/// Encode a logical value into the parameter form handed to `rusqlite`.
///
/// `LogicalValue` already implements `ToSql` directly (see
/// [`crate::value`]), so encoding for statement binding is simply passing the
/// value through; this function exists for the one case the bound encoding
/// doesn't cover — inlining a value into generated DEFAULT/debug SQL, which
/// lives on [`LogicalValue::to_default_literal`].
#[must_use]
pub fn encode(value: &LogicalValue) -> &LogicalValue {
    value
}

/// Decode one selected row from the engine into a [`Row`].
///
/// For each column known to `table`, apply the kind-specific decoding rule
/// from §4.2 (`date` from epoch millis, `bool` from `0/1`, `json` parsed with
/// silent fallback to raw text). Columns not present in `table` (e.g. the
/// result of a raw query reaching past the table's own columns) pass through
/// using [`decode_untyped`].
pub fn decode_row(table: &Table, sql_row: &SqlRow<'_>) -> rusqlite::Result<Row> {
    let mut row = Row::new();
    for (idx, column_name) in sql_row.as_ref().column_names().iter().enumerate() {
        let value_ref = sql_row.get_ref(idx)?;
        let logical = match table.column(column_name) {
            Some(column) => decode_typed(&column.kind, value_ref),
            None => decode_untyped(value_ref),
        };
        row.insert((*column_name).to_string(), logical);
    }
    Ok(row)
}

/// Decode a single column value from engine storage using `kind`'s rule.
#[must_use]
pub fn decode_typed(kind: &ColumnKind, value: ValueRef<'_>) -> LogicalValue {
    if matches!(value, ValueRef::Null) {
        return LogicalValue::Null;
    }
    match kind {
        ColumnKind::Int { .. } => decode_untyped(value),
        ColumnKind::Real { .. } => decode_untyped(value),
        ColumnKind::Text { .. } => decode_untyped(value),
        ColumnKind::Bool { .. } => LogicalValue::Bool(value.as_i64().unwrap_or(0) != 0),
        ColumnKind::Date { .. } => LogicalValue::Date(millis_to_datetime(value.as_i64().unwrap_or_default())),
        ColumnKind::Json { .. } => {
            let text = value.as_str().unwrap_or_default();
            serde_json::from_str::<serde_json::Value>(text)
                .map_or_else(|_| LogicalValue::Text(text.to_string()), LogicalValue::Json)
        }
    }
}

/// Decode a column with no schema knowledge: pass the storage value through
/// by its native SQLite type affinity (§4.2 "unknown columns pass through
/// unchanged").
#[must_use]
pub fn decode_untyped(value: ValueRef<'_>) -> LogicalValue {
    match value {
        ValueRef::Null => LogicalValue::Null,
        ValueRef::Integer(v) => LogicalValue::Int(v),
        ValueRef::Real(v) => LogicalValue::Real(v),
        ValueRef::Text(v) => LogicalValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => LogicalValue::Text(String::from_utf8_lossy(v).into_owned()),
    }
}
