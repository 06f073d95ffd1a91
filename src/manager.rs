//! Database lifecycle: connect/disconnect, backup/restore, merge, schema
//! export/import, transactions, optimize, stats, integrity (§4.8).

use crate::error::{Result, StoreError};
use crate::pool::config::PoolConfig;
use crate::pool::Pool;
use crate::schema::export::{export_schema, import_schema, SchemaExport};
use crate::schema::{Schema, Table as TableDef};
use crate::table::Table;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::Connection;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Isolation level for [`DatabaseManager::execute_pooled_transaction`] (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Deferred,
    Immediate,
    Exclusive,
}

impl Isolation {
    const fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED",
            Self::Immediate => "BEGIN IMMEDIATE",
            Self::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// `{compress?, format?}` (§6 External interfaces: binary file vs. schema JSON).
#[derive(Debug, Clone, Copy)]
pub struct BackupOptions {
    pub compress: bool,
    pub format: BackupFormat,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self { compress: false, format: BackupFormat::Binary }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Binary,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    pub drop_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeConflictResolution {
    Replace,
    Ignore,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub conflict_resolution: Option<MergeConflictResolution>,
    pub tables_filter: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeCompatibility {
    pub compatible_tables: Vec<CompatibleTable>,
    pub incompatible_tables: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CompatibleTable {
    pub name: String,
    pub compatible_columns: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeOptions {
    pub vacuum: bool,
    pub analyze: bool,
    pub reindex: bool,
}

#[derive(Debug, Clone)]
pub struct TableRecordStat {
    pub name: String,
    pub records: i64,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub tables: usize,
    pub total_records: i64,
    pub database_size: i64,
    pub table_stats: Vec<TableRecordStat>,
    pub indexes: usize,
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Owns exactly one primary connection and, optionally, a pool (§3
/// Ownership/lifecycle). Vends [`Table`] façades keyed by table name.
pub struct DatabaseManager {
    database_path: PathBuf,
    schema: Schema,
    primary: Option<Connection>,
    pool: Option<Arc<Pool>>,
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("database_path", &self.database_path)
            .field("schema", &self.schema)
            .field("has_primary", &self.primary.is_some())
            .field("has_pool", &self.pool.is_some())
            .finish()
    }
}

impl DatabaseManager {
    /// `connect({databasePath, schema, …})` (§4.8): open or create the file
    /// with the primary-connection pragmas (§4.7) and register `schema`.
    pub fn connect(database_path: impl Into<PathBuf>, schema: Schema, pool_config: Option<PoolConfig>) -> Result<Self> {
        schema.validate()?;
        let database_path = database_path.into();
        let conn = Connection::open(&database_path)?;
        apply_primary_pragmas(&conn)?;
        for table in &schema.tables {
            conn.execute_batch(&crate::schema::ddl::create_table(table))?;
        }

        let pool = pool_config.map(|cfg| Pool::open(database_path.clone(), cfg)).transpose()?;

        Ok(Self { database_path, schema, primary: Some(conn), pool })
    }

    /// `disconnect()` (§4.8): idempotent.
    pub fn disconnect(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
        self.primary = None;
    }

    fn connection(&self) -> Result<&Connection> {
        self.primary.as_ref().ok_or(StoreError::NotConnected)
    }

    fn table_def(&self, name: &str) -> Result<&TableDef> {
        self.schema.table(name).ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    /// Vend a façade for `name`, borrowing the primary connection and schema.
    pub fn table(&self, name: &str) -> Result<Table<'_>> {
        let conn = self.connection()?;
        let def = self.table_def(name)?;
        Ok(Table::new(conn, def))
    }

    #[must_use]
    pub const fn pool(&self) -> Option<&Arc<Pool>> {
        self.pool.as_ref()
    }

    /// `backup(path, {compress, format})` (§4.8).
    pub fn backup(&self, path: &Path, options: BackupOptions) -> Result<()> {
        let conn = self.connection()?;
        match options.format {
            BackupFormat::Binary => self.backup_binary(conn, path, options.compress),
            BackupFormat::Json => self.backup_schema_json(conn, path, options.compress),
        }
    }

    fn backup_binary(&self, conn: &Connection, path: &Path, compress: bool) -> Result<()> {
        let tmp = path.with_extension("tmp-vacuum");
        conn.execute_batch(&format!("VACUUM INTO '{}'", tmp.display()))?;
        if compress {
            let target = with_gz_suffix(path);
            gzip_file(&tmp, &target)?;
            std::fs::remove_file(&tmp)?;
        } else {
            std::fs::rename(&tmp, path)?;
        }
        Ok(())
    }

    fn backup_schema_json(&self, conn: &Connection, path: &Path, compress: bool) -> Result<()> {
        let export = export_schema(conn)?;
        let json = serde_json::to_string_pretty(&export)?;
        if compress {
            let target = with_gz_suffix(path);
            gzip_bytes(json.as_bytes(), &target)?;
        } else {
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// `restore(path, {dropExisting})` (§4.8).
    pub fn restore(&mut self, path: &Path, options: RestoreOptions) -> Result<()> {
        if !path.exists() {
            return Err(StoreError::BackupNotFound(path.display().to_string()));
        }

        let is_gz = path.extension().is_some_and(|ext| ext == "gz");
        let working = if is_gz {
            let tmp = path.with_extension("");
            gunzip_file(path, &tmp)?;
            tmp
        } else {
            path.to_path_buf()
        };

        let is_json = looks_like_json(&working)?;

        if options.drop_existing {
            let conn = self.connection()?;
            for table in &self.schema.tables {
                conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", table.name))?;
            }
        }

        if is_json {
            let text = std::fs::read_to_string(&working)?;
            let export: SchemaExport = serde_json::from_str(&text)?;
            import_schema(self.connection()?, &export)?;
        } else {
            let source = Connection::open_with_flags(&working, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            let export = export_schema(&source)?;
            let target = self.connection()?;
            import_schema(target, &export)?;
            for table in &export.tables {
                copy_table_rows(&source, target, &table.name)?;
            }
        }

        if is_gz {
            let _ = std::fs::remove_file(&working);
        }
        Ok(())
    }

    /// `mergeDatabase(sourcePath, {conflictResolution, tablesFilter})` (§4.8).
    pub fn merge_database(&self, source_path: &Path, options: MergeOptions) -> Result<()> {
        let conn = self.connection()?;
        let alias = "merge_source";
        conn.execute_batch(&format!("ATTACH DATABASE '{}' AS {alias}", source_path.display()))?;

        let result = self.merge_attached(conn, alias, &options);

        let _ = conn.execute_batch(&format!("DETACH DATABASE {alias}"));
        result
    }

    fn merge_attached(&self, conn: &Connection, alias: &str, options: &MergeOptions) -> Result<()> {
        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM {alias}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
        ))?;
        let source_tables: Vec<String> = stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?;
        drop(stmt);

        let resolution = options.conflict_resolution.unwrap_or(MergeConflictResolution::Replace);
        for name in source_tables {
            if let Some(filter) = &options.tables_filter {
                if !filter.contains(&name) {
                    continue;
                }
            }

            let target_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1)",
                [&name],
                |r| r.get(0),
            )?;

            let outcome = if target_exists {
                let verb = match resolution {
                    MergeConflictResolution::Replace => "INSERT OR REPLACE",
                    MergeConflictResolution::Ignore => "INSERT OR IGNORE",
                    MergeConflictResolution::Fail => "INSERT OR ABORT",
                };
                conn.execute_batch(&format!(
                    "{verb} INTO \"{name}\" SELECT * FROM {alias}.\"{name}\""
                ))
            } else {
                conn.execute_batch(&format!(
                    "CREATE TABLE \"{name}\" AS SELECT * FROM {alias}.\"{name}\""
                ))
            };

            if let Err(err) = outcome {
                let classified = StoreError::from(err);
                if resolution == MergeConflictResolution::Fail {
                    return Err(StoreError::MergeConflict { table: name, message: classified.to_string() });
                }
            }
        }
        Ok(())
    }

    /// `analyzeMergeCompatibility(sourcePath)` (§4.8): compare stored table
    /// `sql` between source and target; equal schema text is "compatible".
    pub fn analyze_merge_compatibility(&self, source_path: &Path) -> Result<MergeCompatibility> {
        let source = Connection::open_with_flags(source_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let source_ddl = table_ddl_map(&source)?;
        let target_ddl = table_ddl_map(self.connection()?)?;

        let mut compatible_tables = Vec::new();
        let mut incompatible_tables = Vec::new();
        for (name, source_sql) in &source_ddl {
            match target_ddl.get(name) {
                Some(target_sql) if target_sql == source_sql => {
                    let total_columns = column_count(self.connection()?, name)?;
                    compatible_tables.push(CompatibleTable { name: name.clone(), compatible_columns: total_columns, total_columns });
                }
                _ => incompatible_tables.push(name.clone()),
            }
        }
        Ok(MergeCompatibility { compatible_tables, incompatible_tables })
    }

    /// `executeTransaction([sql])` (§4.8): one engine transaction, rollback
    /// on failure.
    pub fn execute_transaction(&mut self, statements: &[String]) -> Result<()> {
        let conn = self.primary.as_mut().ok_or(StoreError::NotConnected)?;
        let tx = conn.transaction()?;
        for sql in statements {
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// `executePooledTransaction([op], isolation)` (§4.8): acquire a pooled
    /// connection, run the ops inside one transaction at the given isolation.
    pub fn execute_pooled_transaction(
        &self,
        isolation: Isolation,
        ops: &[String],
    ) -> Result<()> {
        let pool = self.pool.as_ref().ok_or(StoreError::NotConnected)?;
        let mut guard = pool.acquire()?;
        guard.execute_batch(isolation.begin_sql())?;
        for sql in ops {
            match guard.execute_batch(sql) {
                Ok(()) => guard.record_query(true),
                Err(err) => {
                    guard.record_query(false);
                    let _ = guard.execute_batch("ROLLBACK");
                    return Err(err.into());
                }
            }
        }
        guard.execute_batch("COMMIT")?;
        Ok(())
    }

    /// `optimize({vacuum, analyze, reindex})` (§4.8): run in that order.
    pub fn optimize(&self, options: OptimizeOptions) -> Result<()> {
        let conn = self.connection()?;
        if options.vacuum {
            conn.execute_batch("VACUUM")?;
        }
        if options.analyze {
            conn.execute_batch("ANALYZE")?;
        }
        if options.reindex {
            conn.execute_batch("REINDEX")?;
        }
        Ok(())
    }

    /// `getDatabaseStats()` (§4.8). Per-table `size` is an implementation-
    /// defined approximation (Design Note §9): sourced from the `dbstat`
    /// virtual table when the engine was compiled with it, falling back to
    /// the whole-file size for every table (matching the approximation the
    /// original implementation makes) when it is not.
    pub fn get_database_stats(&self) -> Result<DatabaseStats> {
        let conn = self.connection()?;
        let database_size: i64 = {
            let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
            page_count * page_size
        };

        let dbstat_sizes = dbstat_sizes_by_table(conn).ok();

        let mut total_records = 0_i64;
        let mut table_stats = Vec::with_capacity(self.schema.tables.len());
        for table in &self.schema.tables {
            let records: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table.name), [], |r| r.get(0))?;
            total_records += records;
            let size = dbstat_sizes
                .as_ref()
                .and_then(|sizes| sizes.get(&table.name).copied())
                .unwrap_or(database_size);
            table_stats.push(TableRecordStat { name: table.name.clone(), records, size });
        }

        let indexes: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL",
            [],
            |r| r.get(0),
        )?;

        Ok(DatabaseStats {
            tables: self.schema.tables.len(),
            total_records,
            database_size,
            table_stats,
            indexes: usize::try_from(indexes).unwrap_or(0),
        })
    }

    /// `checkIntegrity()` (§4.8): `PRAGMA integrity_check`; valid iff the
    /// first row equals `"ok"`.
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("PRAGMA integrity_check")?;
        let rows: Vec<String> = stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<_>>()?;
        let is_valid = rows.first().is_some_and(|first| first == "ok");
        Ok(IntegrityReport { is_valid, errors: if is_valid { Vec::new() } else { rows } })
    }

    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Primary-connection pragmas (§4.7): `WAL`, foreign keys on, `NORMAL` sync.
fn apply_primary_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

fn with_gz_suffix(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "gz") {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }
}

fn gzip_file(source: &Path, target: &Path) -> Result<()> {
    let bytes = std::fs::read(source)?;
    gzip_bytes(&bytes, target)
}

fn gzip_bytes(bytes: &[u8], target: &Path) -> Result<()> {
    let file = std::fs::File::create(target)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}

fn gunzip_file(source: &Path, target: &Path) -> Result<()> {
    let file = std::fs::File::open(source)?;
    let mut decoder = GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    std::fs::write(target, bytes)?;
    Ok(())
}

/// Distinguish a schema-only JSON backup from a binary SQLite file by magic
/// bytes, rather than trusting the filename alone.
fn looks_like_json(path: &Path) -> Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut header = [0_u8; 16];
    let read = file.read(&mut header)?;
    Ok(header[..read].iter().any(|b| !b.is_ascii_whitespace()) && header.first() == Some(&b'{'))
}

fn copy_table_rows(source: &Connection, target: &Connection, table: &str) -> Result<()> {
    let column_count: i64 = source.query_row(&format!("SELECT COUNT(*) FROM pragma_table_info('{table}')"), [], |r| r.get(0))?;
    let placeholders = (0..column_count).map(|_| "?").collect::<Vec<_>>().join(", ");
    let select_sql = format!("SELECT * FROM \"{table}\"");
    let insert_sql = format!("INSERT OR REPLACE INTO \"{table}\" VALUES ({placeholders})");

    let mut select_stmt = source.prepare(&select_sql)?;
    let column_names: Vec<String> = select_stmt.column_names().iter().map(|s| (*s).to_string()).collect();
    let mut rows = select_stmt.query([])?;
    let mut insert_stmt = target.prepare(&insert_sql)?;

    while let Some(row) = rows.next()? {
        let values: Vec<rusqlite::types::Value> = (0..column_names.len())
            .map(|idx| row.get::<_, rusqlite::types::Value>(idx))
            .collect::<rusqlite::Result<_>>()?;
        insert_stmt.execute(params_from_values(&values))?;
    }
    Ok(())
}

fn params_from_values(values: &[rusqlite::types::Value]) -> impl rusqlite::Params + '_ {
    rusqlite::params_from_iter(values.iter())
}

fn table_ddl_map(conn: &Connection) -> Result<std::collections::HashMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND sql IS NOT NULL",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().collect())
}

/// `SUM(pgsize)` per table name via the `dbstat` virtual table. Errors (most
/// commonly "no such table: dbstat" on engines built without
/// `SQLITE_ENABLE_DBSTAT_VTAB`) are left for the caller to treat as
/// "unavailable" rather than a hard failure.
fn dbstat_sizes_by_table(conn: &Connection) -> Result<std::collections::HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT name, SUM(pgsize) FROM dbstat GROUP BY name")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().collect())
}

fn column_count(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM pragma_table_info('{table}')"), [], |r| r.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::{Column, ColumnKind};
    use crate::schema::table::Table as TableDef;
    use tempfile::tempdir;

    fn widgets_schema() -> Schema {
        Schema::new(vec![TableDef::new(
            "widgets",
            vec![
                Column::new("id", ColumnKind::Int { auto_increment: true, union: None, default: None }).primary(),
                Column::new("sku", ColumnKind::Text { union: None, default: None }).unique(),
            ],
        )])
    }

    #[test]
    fn connect_creates_schema_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let manager = DatabaseManager::connect(path, widgets_schema(), None).unwrap();
        let table = manager.table("widgets").unwrap();
        assert_eq!(table.get_table_stats().unwrap().record_count, 0);
    }

    #[test]
    fn backup_then_restore_round_trips_row_count() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("db.sqlite3");
        let backup_path = dir.path().join("backup.sqlite3.gz");

        let mut manager = DatabaseManager::connect(&db_path, widgets_schema(), None).unwrap();
        {
            let table = manager.table("widgets").unwrap();
            let mut row = crate::value::Row::new();
            row.insert("sku".to_string(), crate::value::LogicalValue::Text("abc".into()));
            table.insert(vec![row]).unwrap();
        }

        manager.backup(&backup_path, BackupOptions { compress: true, ..BackupOptions::default() }).unwrap();
        manager.restore(&backup_path, RestoreOptions { drop_existing: true }).unwrap();

        let table = manager.table("widgets").unwrap();
        assert_eq!(table.get_table_stats().unwrap().record_count, 1);
    }

    #[test]
    fn pooled_transaction_commits_through_a_checked_out_connection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let manager = DatabaseManager::connect(&path, widgets_schema(), Some(PoolConfig::default())).unwrap();

        manager
            .execute_pooled_transaction(
                Isolation::Immediate,
                &["INSERT INTO widgets (sku) VALUES ('abc')".to_string()],
            )
            .unwrap();

        let table = manager.table("widgets").unwrap();
        assert_eq!(table.get_table_stats().unwrap().record_count, 1);
    }

    #[test]
    fn check_integrity_reports_ok_on_fresh_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let manager = DatabaseManager::connect(path, widgets_schema(), None).unwrap();
        let report = manager.check_integrity().unwrap();
        assert!(report.is_valid);
    }

    #[test]
    fn table_lookup_for_unknown_name_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let manager = DatabaseManager::connect(path, widgets_schema(), None).unwrap();
        assert!(manager.table("missing").is_err());
    }
}
