//! Declarative schema model: tables, columns, JSON shapes, DDL emission,
//! export/import, and runtime type projection (§3, §4.1).

pub mod column;
pub mod ddl;
pub mod export;
pub mod json_shape;
pub mod project;
pub mod table;

pub use column::{Column, ColumnFlags, ColumnKind};
pub use json_shape::{JsonLiteral, JsonShape};
pub use table::Table;

/// A registered schema: the set of tables a [`crate::manager::DatabaseManager`]
/// knows how to materialize and vend façades for.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    #[must_use]
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Validate every table descriptor in the schema (§3 invariants).
    pub fn validate(&self) -> crate::error::Result<()> {
        for table in &self.tables {
            table.validate()?;
        }
        Ok(())
    }
}
