//! The logical value model shared by the schema, codec, and predicate compiler.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

/// A single logical value as seen by callers of the table façade.
///
/// This is the "row type" counterpart described in the specification's
/// design notes: in a language with structural/mapped types the insert and
/// select shapes are distinct generated types per table; here they are
/// enforced at runtime against this closed enum (see
/// [`crate::schema::project`]).
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Date(DateTime<Utc>),
    Json(serde_json::Value),
}

/// A row is an ordered map from column name to logical value.
///
/// `BTreeMap` gives deterministic iteration order, which matters for JSON
/// export (§4.4 `exportToJson`) and for building stable SQL column lists.
pub type Row = BTreeMap<String, LogicalValue>;

impl LogicalValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render a `DEFAULT <literal>` SQL fragment for this value (§4.1).
    #[must_use]
    pub fn to_default_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(v) => v.to_string(),
            Self::Real(v) => v.to_string(),
            Self::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            Self::Text(v) => quote_sql_string(v),
            Self::Date(v) => v.timestamp_millis().to_string(),
            Self::Json(v) => quote_sql_string(&v.to_string()),
        }
    }
}

fn quote_sql_string(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

impl rusqlite::ToSql for LogicalValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Self::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Self::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            Self::Text(v) => ToSqlOutput::Owned(Value::Text(v.clone())),
            Self::Date(v) => ToSqlOutput::Owned(Value::Integer(v.timestamp_millis())),
            Self::Json(v) => ToSqlOutput::Owned(Value::Text(
                serde_json::to_string(v).unwrap_or_default(),
            )),
        })
    }
}

/// Convert a millisecond epoch timestamp into a UTC `DateTime`, clamping on
/// overflow rather than panicking (defensive against hand-edited databases).
#[must_use]
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_literal_escapes_quotes() {
        let v = LogicalValue::Text("O'Brien".to_string());
        assert_eq!(v.to_default_literal(), "'O''Brien'");
    }

    #[test]
    fn default_literal_bool_is_integer() {
        assert_eq!(LogicalValue::Bool(true).to_default_literal(), "1");
        assert_eq!(LogicalValue::Bool(false).to_default_literal(), "0");
    }

    #[test]
    fn millis_round_trip() {
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let back = millis_to_datetime(millis);
        assert_eq!(back.timestamp_millis(), millis);
    }
}
