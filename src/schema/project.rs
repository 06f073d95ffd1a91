//! Type projection: deriving a table's insert/select optionality rules and
//! enforcing union (enum) constraints at runtime (§3, §4.1, Design Note §9).
//!
//! A statically-typed source would generate sibling `Insert`/`Select` record
//! types per table; this implementation is dynamically typed (rows are
//! [`crate::value::Row`]), so the same rules are enforced here as runtime
//! validation instead of at compile time.

use crate::error::{Result, StoreError};
use crate::schema::column::Column;
use crate::schema::table::Table;
use crate::value::{LogicalValue, Row};

/// Columns that must be present in a row passed to `insert` (§3 Insert shape):
/// every column except those with `autoIncrement`, a `default`, or `nullable`.
#[must_use]
pub fn required_insert_columns(table: &Table) -> Vec<&Column> {
    table.columns.iter().filter(|c| !c.optional_on_insert()).collect()
}

/// Validate that `row` satisfies the table's insert shape: all required
/// columns present, and every provided value obeys its column's union
/// constraint (when one is declared) and does not name an unknown column.
pub fn validate_insert_row(table: &Table, row: &Row) -> Result<()> {
    for column in required_insert_columns(table) {
        if !row.contains_key(&column.name) {
            return Err(StoreError::invalid_argument(format!(
                "column '{}' is required on insert into table '{}'",
                column.name, table.name
            )));
        }
    }
    validate_known_columns_and_unions(table, row)
}

/// Validate that every key in `row` names a known column of `table` and that
/// its value satisfies that column's union constraint, if any. Used by both
/// `insert` and `update` (§4.4), since `update`'s values are a subset of the
/// insert shape with no required-ness check.
pub fn validate_known_columns_and_unions(table: &Table, row: &Row) -> Result<()> {
    for (name, value) in row {
        let column = table.column(name).ok_or_else(|| StoreError::UnknownColumn {
            table: table.name.clone(),
            column: name.clone(),
        })?;
        if !value.is_null() && !column.kind.satisfies_union(value) {
            return Err(StoreError::UnionConstraintViolation {
                column: name.clone(),
                value: debug_value(value),
            });
        }
    }
    Ok(())
}

fn debug_value(value: &LogicalValue) -> String {
    match value {
        LogicalValue::Null => "null".to_string(),
        LogicalValue::Int(v) => v.to_string(),
        LogicalValue::Real(v) => v.to_string(),
        LogicalValue::Text(v) => v.clone(),
        LogicalValue::Bool(v) => v.to_string(),
        LogicalValue::Date(v) => v.to_rfc3339(),
        LogicalValue::Json(v) => v.to_string(),
    }
}

/// Columns guaranteed present in every row returned from `select` (§3 Select
/// shape): every column, since `default`-bearing columns are populated by the
/// engine and therefore always present in results.
#[must_use]
pub fn select_shape_columns(table: &Table) -> Vec<&Column> {
    table.columns.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnKind;

    fn users_table() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnKind::Int { auto_increment: true, union: None, default: None }).primary(),
                Column::new("email", ColumnKind::Text { union: None, default: None }).unique(),
                Column::new(
                    "role",
                    ColumnKind::Text { union: Some(vec!["admin".into(), "user".into()]), default: Some("user".into()) },
                ),
            ],
        )
    }

    #[test]
    fn required_insert_columns_excludes_autoinc_and_default() {
        let table = users_table();
        let required: Vec<&str> = required_insert_columns(&table).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(required, vec!["email"]);
    }

    #[test]
    fn validate_insert_row_rejects_missing_required_column() {
        let table = users_table();
        let row: Row = Row::new();
        assert!(validate_insert_row(&table, &row).is_err());
    }

    #[test]
    fn validate_insert_row_rejects_union_violation() {
        let table = users_table();
        let mut row = Row::new();
        row.insert("email".to_string(), LogicalValue::Text("a@x".into()));
        row.insert("role".to_string(), LogicalValue::Text("root".into()));
        assert!(validate_insert_row(&table, &row).is_err());
    }

    #[test]
    fn validate_insert_row_accepts_minimal_valid_row() {
        let table = users_table();
        let mut row = Row::new();
        row.insert("email".to_string(), LogicalValue::Text("a@x".into()));
        assert!(validate_insert_row(&table, &row).is_ok());
    }

    #[test]
    fn validate_known_columns_rejects_unknown_column() {
        let table = users_table();
        let mut row = Row::new();
        row.insert("nickname".to_string(), LogicalValue::Text("x".into()));
        assert!(validate_known_columns_and_unions(&table, &row).is_err());
    }
}
