//! Table descriptors and the structural invariants that bind a [`Table`]'s
//! columns together (§3).

use crate::error::{Result, StoreError};
use crate::schema::column::Column;
use std::collections::HashSet;

/// A single declarative table descriptor: a name plus its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { name: name.into(), columns }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn primary_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_primary()).collect()
    }

    /// Enforce the five structural invariants from §3:
    /// 1. `name` is non-empty.
    /// 2. The table declares at least one column.
    /// 3. The table declares at least one `primary` column.
    /// 4. Column names are unique within the table.
    /// 5. `autoIncrement` implies the column is `int` and `primary`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::invalid_schema("table name must not be empty"));
        }
        if self.columns.is_empty() {
            return Err(StoreError::invalid_schema(format!(
                "table '{}' must declare at least one column",
                self.name
            )));
        }
        if self.primary_columns().is_empty() {
            return Err(StoreError::invalid_schema(format!(
                "table '{}' must declare at least one primary column",
                self.name
            )));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(StoreError::invalid_schema(format!(
                    "table '{}' declares column '{}' more than once",
                    self.name, column.name
                )));
            }
            if column.kind.auto_increment() && !(column.kind.is_int() && column.is_primary()) {
                return Err(StoreError::invalid_schema(format!(
                    "column '{}' in table '{}' is autoIncrement but not an int primary column",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnKind;

    fn int_col(name: &str) -> Column {
        Column::new(name, ColumnKind::Int { auto_increment: false, union: None, default: None })
    }

    #[test]
    fn rejects_empty_name() {
        let table = Table::new("", vec![int_col("id").primary()]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn rejects_no_columns() {
        let table = Table::new("widgets", vec![]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn rejects_missing_primary() {
        let table = Table::new("widgets", vec![int_col("id")]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_column_names() {
        let table = Table::new("widgets", vec![int_col("id").primary(), int_col("id")]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn rejects_autoincrement_without_int_primary() {
        let bad = Column::new(
            "id",
            ColumnKind::Int { auto_increment: true, union: None, default: None },
        );
        let table = Table::new("widgets", vec![bad, int_col("shadow_id").primary()]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn accepts_minimal_valid_table() {
        let table = Table::new(
            "widgets",
            vec![int_col("id").primary(), int_col("owner_id")],
        );
        assert!(table.validate().is_ok());
    }
}
