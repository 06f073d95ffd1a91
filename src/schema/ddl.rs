//! DDL emission: `CREATE TABLE`, `CREATE INDEX`/`DROP INDEX` (§4.1).

use crate::schema::column::{Column, ColumnKind};
use crate::schema::table::Table;

/// An index descriptor as accepted by [`create_index`].
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub if_not_exists: bool,
}

/// Emit `CREATE TABLE IF NOT EXISTS` for `table`.
///
/// Assumes `table.validate()` has already succeeded; callers are expected to
/// call [`Table::validate`] before reaching the DDL emitter.
#[must_use]
pub fn create_table(table: &Table) -> String {
    let composite_pk = table.primary_columns().len() > 1;

    let mut clauses: Vec<String> = table
        .columns
        .iter()
        .map(|col| column_clause(col, composite_pk))
        .collect();

    if composite_pk {
        let pk_columns = table
            .primary_columns()
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        clauses.push(format!("PRIMARY KEY ({pk_columns})"));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n) STRICT",
        table.name,
        clauses.join(",\n    ")
    )
}

/// Render a single column's definition. `composite_pk` is `true` when the
/// owning table has more than one primary column: SQLite allows only one
/// `PRIMARY KEY` clause per `CREATE TABLE`, so in that case every primary
/// column's `PRIMARY KEY`/`AUTOINCREMENT` tokens are omitted here and a
/// trailing table-level `PRIMARY KEY (...)` constraint is emitted instead
/// (see [`create_table`]). A single primary column still gets the inline
/// form, since SQLite requires it for `AUTOINCREMENT`.
fn column_clause(column: &Column, composite_pk: bool) -> String {
    let mut parts = vec![format!("\"{}\"", column.name), column.kind.storage_type().to_string()];

    if column.is_primary() && !composite_pk {
        parts.push("PRIMARY KEY".to_string());
        if column.kind.auto_increment() {
            parts.push("AUTOINCREMENT".to_string());
        }
    } else if column.flags.unique {
        parts.push("UNIQUE".to_string());
    }

    if !column.is_nullable() && !column.is_primary() {
        parts.push("NOT NULL".to_string());
    }

    if let Some(default) = column.kind.default_value() {
        parts.push(format!("DEFAULT {}", default.to_default_literal()));
    }

    parts.join(" ")
}

/// Emit a `CREATE INDEX` statement.
#[must_use]
pub fn create_index(spec: &IndexSpec, table_name: &str) -> String {
    let unique = if spec.unique { " UNIQUE" } else { "" };
    let if_not_exists = if spec.if_not_exists { " IF NOT EXISTS" } else { "" };
    let columns = spec
        .columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE{unique} INDEX{if_not_exists} \"{}\" ON \"{}\" ({columns})",
        spec.name, table_name
    )
}

/// Emit a `DROP INDEX` statement.
#[must_use]
pub fn drop_index(name: &str, if_exists: bool) -> String {
    let if_exists = if if_exists { " IF EXISTS" } else { "" };
    format!("DROP INDEX{if_exists} \"{name}\"")
}

/// A reconstructed column description from engine introspection
/// (`PRAGMA table_info`), used by schema export/import (§4.1, §4.8).
#[derive(Debug, Clone)]
pub struct IntrospectedColumn {
    pub cid: i64,
    pub name: String,
    pub declared_type: String,
    pub notnull: bool,
    pub default_sql: Option<String>,
    pub pk: i64,
}

/// Reconstruct `CREATE TABLE IF NOT EXISTS` DDL purely from engine
/// introspection, as used by restore (§4.8) when no logical [`Table`] is
/// available — only raw column metadata from `sqlite_master`/`pragma_table_info`.
#[must_use]
pub fn create_table_from_introspection(table_name: &str, columns: &[IntrospectedColumn]) -> String {
    let mut by_cid = columns.to_vec();
    by_cid.sort_by_key(|c| c.cid);

    let rendered = by_cid
        .iter()
        .map(|col| {
            let mut parts = vec![format!("\"{}\"", col.name), col.declared_type.clone()];
            if col.pk > 0 {
                parts.push("PRIMARY KEY".to_string());
            } else if col.notnull {
                parts.push("NOT NULL".to_string());
            }
            if let Some(default) = &col.default_sql {
                parts.push(format!("DEFAULT {default}"));
            }
            parts.join(" ")
        })
        .collect::<Vec<_>>()
        .join(",\n    ");

    format!("CREATE TABLE IF NOT EXISTS \"{table_name}\" (\n    {rendered}\n)")
}

/// Map a column kind's storage type the way `ColumnKind::storage_type` does,
/// exposed standalone for the exported schema document (§4.1).
#[must_use]
pub const fn storage_type(kind: &ColumnKind) -> &'static str {
    kind.storage_type()
}
