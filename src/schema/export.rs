//! Schema export/import via engine introspection (§4.1).

use crate::error::Result;
use crate::schema::ddl::{create_table_from_introspection, IntrospectedColumn};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

const SCHEMA_EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedColumn {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub notnull: bool,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedIndex {
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTable {
    pub name: String,
    pub columns: Vec<ExportedColumn>,
    pub indexes: Vec<ExportedIndex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaExport {
    pub version: String,
    pub created: String,
    pub tables: Vec<ExportedTable>,
}

/// Export the live schema of `conn` by introspecting `sqlite_master` and
/// `pragma_table_info` for every user table (§4.1).
pub fn export_schema(conn: &Connection) -> Result<SchemaExport> {
    let mut table_stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let table_names: Vec<String> = table_stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    drop(table_stmt);

    let mut tables = Vec::with_capacity(table_names.len());
    for name in table_names {
        let columns = introspect_columns(conn, &name)?;
        let indexes = introspect_indexes(conn, &name)?;
        tables.push(ExportedTable { name, columns, indexes });
    }

    Ok(SchemaExport {
        version: SCHEMA_EXPORT_VERSION.to_string(),
        created: Utc::now().to_rfc3339(),
        tables,
    })
}

fn introspect_columns(conn: &Connection, table: &str) -> Result<Vec<ExportedColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ExportedColumn {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get(2)?,
                notnull: row.get::<_, i64>(3)? != 0,
                dflt_value: row.get(4)?,
                pk: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
}

fn introspect_indexes(conn: &Connection, table: &str) -> Result<Vec<ExportedIndex>> {
    let mut stmt = conn.prepare(
        "SELECT name, sql FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL",
    )?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(ExportedIndex { name: row.get(0)?, sql: row.get(1)? })
        })?
        .collect::<rusqlite::Result<_>>()?;
    Ok(rows)
}

/// Recreate every table and index named in `export` (§4.1 `importSchema`).
pub fn import_schema(conn: &Connection, export: &SchemaExport) -> Result<()> {
    for table in &export.tables {
        let introspected: Vec<IntrospectedColumn> = table
            .columns
            .iter()
            .map(|c| IntrospectedColumn {
                cid: c.cid,
                name: c.name.clone(),
                declared_type: c.declared_type.clone(),
                notnull: c.notnull,
                default_sql: c.dflt_value.clone(),
                pk: c.pk,
            })
            .collect();
        let ddl = create_table_from_introspection(&table.name, &introspected);
        conn.execute_batch(&ddl)?;
        for index in &table.indexes {
            conn.execute_batch(&index.sql)?;
        }
    }
    Ok(())
}
