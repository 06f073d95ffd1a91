//! The per-table façade: type-safe CRUD, bulk operations, pagination,
//! aggregation, JSON import/export, sync, and raw queries (§4.4).

pub mod query_builder;

use crate::codec::decode_row;
use crate::error::{Result, StoreError};
use crate::predicate::Predicate;
use crate::retry::with_retry;
use crate::schema::ddl::{self, IndexSpec};
use crate::schema::project::{validate_insert_row, validate_known_columns_and_unions};
use crate::schema::table::Table as TableDef;
use crate::value::{LogicalValue, Row};
use chrono::Utc;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;

pub use query_builder::QueryBuilder;

const DEFAULT_BULK_BATCH_SIZE: usize = 1000;

/// Options accepted by [`Table::select`] / [`Table::find_first`] (§4.4).
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub predicate: Predicate,
    pub select: Vec<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default)]
pub struct PaginateOptions {
    pub predicate: Predicate,
    pub select: Vec<String>,
    pub page: i64,
    pub page_size: i64,
    pub order_by: Option<OrderBy>,
}

#[derive(Debug, Clone)]
pub struct PaginatedResult {
    pub data: Vec<Row>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Aggregate functions accepted by [`Table::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFn {
    const fn sql(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

/// Policy applied to a conflicting row during `importFromJson`/`syncWith` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    Replace,
    Ignore,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub conflict_resolution: Option<ConflictResolution>,
    pub batch_size: Option<usize>,
    pub validate_schema: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Strategy applied per source row in [`Table::sync_with`] (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    Replace,
    Update,
    Ignore,
}

pub struct SyncOptions<'cb> {
    pub key_column: String,
    pub conflict_resolution: SyncStrategy,
    pub batch_size: usize,
    pub on_progress: Option<&'cb mut dyn FnMut(usize, usize)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ColumnStat {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub primary: bool,
}

#[derive(Debug, Clone)]
pub struct TableStats {
    pub name: String,
    pub record_count: i64,
    pub columns: Vec<ColumnStat>,
    pub indexes: Vec<String>,
    pub estimated_size: String,
}

/// The per-table façade. Borrows the owning manager's connection and schema
/// descriptor; holds no mutable state of its own (§3 Ownership/lifecycle).
pub struct Table<'a> {
    conn: &'a Connection,
    def: &'a TableDef,
}

impl<'a> Table<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection, def: &'a TableDef) -> Self {
        Self { conn, def }
    }

    #[must_use]
    pub fn query(&'a self) -> QueryBuilder<'a> {
        QueryBuilder::new(self)
    }

    fn column_list(&self, select: &[String]) -> Result<String> {
        if select.is_empty() {
            return Ok("*".to_string());
        }
        for name in select {
            if self.def.column(name).is_none() {
                return Err(StoreError::UnknownColumn { table: self.def.name.clone(), column: name.clone() });
            }
        }
        Ok(select.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", "))
    }

    /// `select({where?, select?, limit?, skip?}) → [row]` (§4.4).
    pub fn select(&self, options: SelectOptions) -> Result<Vec<Row>> {
        if options.limit.is_some_and(|l| l < 0) || options.skip.is_some_and(|s| s < 0) {
            return Err(StoreError::invalid_argument("limit and skip must not be negative"));
        }
        let Some(compiled) = options.predicate.compile() else {
            return Ok(Vec::new());
        };

        let columns = self.column_list(&options.select)?;
        let mut sql = format!("SELECT {columns} FROM \"{}\" {}", self.def.name, compiled.where_sql);
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(skip) = options.skip {
            sql.push_str(&format!(" OFFSET {skip}"));
        }

        with_retry(|| self.run_select(&sql, &compiled.params))
    }

    fn run_select(&self, sql: &str, params: &[LogicalValue]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |r| decode_row(self.def, r))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// `findFirst({where?, select?}) → row | null` (§4.4).
    pub fn find_first(&self, mut options: SelectOptions) -> Result<Option<Row>> {
        options.limit = Some(1);
        Ok(self.select(options)?.into_iter().next())
    }

    /// `exists({where?}) → bool` (§4.4).
    pub fn exists(&self, predicate: Predicate) -> Result<bool> {
        let Some(compiled) = predicate.compile() else {
            return Ok(false);
        };
        let sql = format!("SELECT 1 FROM \"{}\" {} LIMIT 1", self.def.name, compiled.where_sql);
        with_retry(|| {
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let found = stmt.exists(params_from_iter(compiled.params.iter()))?;
            Ok(found)
        })
    }

    /// `count({where?}) → int` (§4.4).
    pub fn count(&self, predicate: Predicate) -> Result<i64> {
        let Some(compiled) = predicate.compile() else {
            return Ok(0);
        };
        let sql = format!("SELECT COUNT(*) FROM \"{}\" {}", self.def.name, compiled.where_sql);
        with_retry(|| {
            let count = self
                .conn
                .prepare_cached(&sql)?
                .query_row(params_from_iter(compiled.params.iter()), |r| r.get(0))?;
            Ok(count)
        })
    }

    /// `insert([row])` (§4.4). Runs under a single transaction with a reused
    /// prepared statement.
    pub fn insert(&self, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Err(StoreError::invalid_argument("insert requires at least one row"));
        }
        for row in &rows {
            validate_insert_row(self.def, row)?;
        }
        with_retry(|| self.run_insert(&rows))
    }

    fn run_insert(&self, rows: &[Row]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for row in rows {
            let (columns, placeholders, params) = insert_fragments(row);
            let sql = format!(
                "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders})",
                self.def.name
            );
            tx.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
        }
        tx.commit()?;
        Ok(())
    }

    /// `bulkInsert([row], batchSize=1000) → [insertedRowId]` (§4.4). Chunked
    /// transactions; returns `lastInsertRowid` per row, preserving input order.
    pub fn bulk_insert(&self, rows: Vec<Row>, batch_size: Option<usize>) -> Result<Vec<i64>> {
        if rows.is_empty() {
            return Err(StoreError::invalid_argument("bulkInsert requires at least one row"));
        }
        for row in &rows {
            validate_insert_row(self.def, row)?;
        }
        let batch_size = batch_size.unwrap_or(DEFAULT_BULK_BATCH_SIZE).max(1);

        let mut ids = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(batch_size) {
            let chunk_ids = with_retry(|| self.run_bulk_chunk(chunk))?;
            ids.extend(chunk_ids);
        }
        Ok(ids)
    }

    fn run_bulk_chunk(&self, chunk: &[Row]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(chunk.len());
        for row in chunk {
            let (columns, placeholders, params) = insert_fragments(row);
            let sql = format!(
                "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders})",
                self.def.name
            );
            tx.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;
        Ok(ids)
    }

    /// `upsert([row], conflictColumns[], updateColumns?)` (§4.4).
    pub fn upsert(&self, rows: Vec<Row>, conflict_columns: &[String], update_columns: Option<&[String]>) -> Result<()> {
        if rows.is_empty() {
            return Err(StoreError::invalid_argument("upsert requires at least one row"));
        }
        if conflict_columns.is_empty() {
            return Err(StoreError::invalid_argument("upsert requires at least one conflict column"));
        }
        for row in &rows {
            validate_insert_row(self.def, row)?;
        }
        with_retry(|| self.run_upsert(&rows, conflict_columns, update_columns))
    }

    fn run_upsert(&self, rows: &[Row], conflict_columns: &[String], update_columns: Option<&[String]>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for row in rows {
            let (columns, placeholders, params) = insert_fragments(row);
            let update_cols: Vec<&String> = match update_columns {
                Some(cols) => cols.iter().collect(),
                None => row.keys().filter(|c| !conflict_columns.contains(c)).collect(),
            };
            let conflict_list = conflict_columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
            let set_clause = update_cols
                .iter()
                .map(|c| format!("\"{c}\" = excluded.\"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = if set_clause.is_empty() {
                format!(
                    "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders}) ON CONFLICT({conflict_list}) DO NOTHING",
                    self.def.name
                )
            } else {
                format!(
                    "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders}) ON CONFLICT({conflict_list}) DO UPDATE SET {set_clause}",
                    self.def.name
                )
            };
            tx.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
        }
        tx.commit()?;
        Ok(())
    }

    /// `update({where, values})` (§4.4).
    pub fn update(&self, where_: Predicate, values: Row) -> Result<usize> {
        where_.require_meaningful("update")?;
        if values.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        validate_known_columns_and_unions(self.def, &values)?;

        let Some(compiled) = where_.compile() else {
            return Ok(0);
        };

        let set_clause = values.keys().map(|c| format!("\"{c}\" = ?")).collect::<Vec<_>>().join(", ");
        let sql = format!("UPDATE \"{}\" SET {set_clause} {}", self.def.name, compiled.where_sql);
        let mut params: Vec<LogicalValue> = values.values().cloned().collect();
        params.extend(compiled.params);

        with_retry(|| {
            let affected = self.conn.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
            Ok(affected)
        })
    }

    /// `delete({where})` (§4.4).
    pub fn delete(&self, where_: Predicate) -> Result<usize> {
        where_.require_meaningful("delete")?;
        let Some(compiled) = where_.compile() else {
            return Ok(0);
        };
        let sql = format!("DELETE FROM \"{}\" {}", self.def.name, compiled.where_sql);
        with_retry(|| {
            let affected = self.conn.prepare_cached(&sql)?.execute(params_from_iter(compiled.params.iter()))?;
            Ok(affected)
        })
    }

    /// `distinct({column, where?, limit?}) → [value]` (§4.4).
    pub fn distinct(&self, column: &str, where_: Predicate, limit: Option<i64>) -> Result<Vec<LogicalValue>> {
        if self.def.column(column).is_none() {
            return Err(StoreError::UnknownColumn { table: self.def.name.clone(), column: column.to_string() });
        }
        let Some(compiled) = where_.compile() else {
            return Ok(Vec::new());
        };
        let mut sql = format!("SELECT DISTINCT \"{column}\" FROM \"{}\" {}", self.def.name, compiled.where_sql);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        with_retry(|| {
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let values = stmt
                .query_map(params_from_iter(compiled.params.iter()), |r| {
                    Ok(crate::codec::decode_untyped(r.get_ref(0)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(values)
        })
    }

    /// `aggregate({column, functions, where?}) → {fn→number}` (§4.4).
    pub fn aggregate(&self, column: &str, functions: &[AggregateFn], where_: Predicate) -> Result<HashMap<String, f64>> {
        if functions.is_empty() {
            return Err(StoreError::invalid_argument("aggregate requires at least one function"));
        }
        let Some(compiled) = where_.compile() else {
            return Ok(functions.iter().map(|f| (f.key().to_string(), 0.0)).collect());
        };
        let select_list = functions
            .iter()
            .map(|f| format!("{}(\"{column}\")", f.sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select_list} FROM \"{}\" {}", self.def.name, compiled.where_sql);

        with_retry(|| {
            let result = self.conn.prepare_cached(&sql)?.query_row(params_from_iter(compiled.params.iter()), |r| {
                let mut out = HashMap::with_capacity(functions.len());
                for (idx, f) in functions.iter().enumerate() {
                    let value: Option<f64> = r.get(idx)?;
                    out.insert(f.key().to_string(), value.unwrap_or(0.0));
                }
                Ok(out)
            })?;
            Ok(result)
        })
    }

    /// `paginate({page, pageSize, where?, select?, orderBy?}) → {data, total, page, pageSize, totalPages}` (§4.4).
    pub fn paginate(&self, options: PaginateOptions) -> Result<PaginatedResult> {
        if options.page < 1 || options.page_size < 1 {
            return Err(StoreError::invalid_argument("page and pageSize must be positive"));
        }

        let Some(compiled) = options.predicate.compile() else {
            return Ok(PaginatedResult { data: Vec::new(), total: 0, page: options.page, page_size: options.page_size, total_pages: 0 });
        };

        let total = self.count(options.predicate.clone())?;
        let total_pages = (total + options.page_size - 1) / options.page_size.max(1);

        if options.page > total_pages.max(1) {
            return Ok(PaginatedResult { data: Vec::new(), total, page: options.page, page_size: options.page_size, total_pages });
        }

        let columns = self.column_list(&options.select)?;
        let order_clause = options
            .order_by
            .as_ref()
            .map(|o| format!(" ORDER BY \"{}\" {}", o.column, o.direction.sql()))
            .unwrap_or_default();
        let offset = (options.page - 1) * options.page_size;
        let sql = format!(
            "SELECT {columns} FROM \"{}\" {}{order_clause} LIMIT {} OFFSET {offset}",
            self.def.name, compiled.where_sql, options.page_size
        );

        let data = with_retry(|| self.run_select(&sql, &compiled.params))?;
        Ok(PaginatedResult { data, total, page: options.page, page_size: options.page_size, total_pages })
    }

    /// `createIndex` (delegates to the DDL emitter, §4.4/§4.1).
    pub fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.conn.execute_batch(&ddl::create_index(spec, &self.def.name))?;
        Ok(())
    }

    /// `dropIndex` (delegates to the DDL emitter, §4.4/§4.1).
    pub fn drop_index(&self, name: &str, if_exists: bool) -> Result<()> {
        self.conn.execute_batch(&ddl::drop_index(name, if_exists))?;
        Ok(())
    }

    /// `exportToJson({where?, select?, pretty=true}) → string` (§4.4).
    pub fn export_to_json(&self, options: SelectOptions, pretty: bool) -> Result<String> {
        let rows = self.select(options)?;
        let data: Vec<serde_json::Value> = rows.iter().map(row_to_json).collect();
        let envelope = serde_json::json!({
            "table": self.def.name,
            "exported": Utc::now().to_rfc3339(),
            "count": data.len(),
            "data": data,
        });
        let text = if pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(text)
    }

    /// `importFromJson(jsonOrObject, {conflictResolution, batchSize, validateSchema})` (§4.4).
    pub fn import_from_json(&self, json: &str, options: ImportOptions) -> Result<ImportReport> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let rows_json = value.get("data").cloned().unwrap_or(value);
        let Some(array) = rows_json.as_array() else {
            return Err(StoreError::invalid_argument("importFromJson expects an array of rows or an export envelope"));
        };

        let conflict_resolution = options.conflict_resolution.unwrap_or(ConflictResolution::Fail);
        let batch_size = options.batch_size.unwrap_or(DEFAULT_BULK_BATCH_SIZE).max(1);
        let validate_schema = options.validate_schema.unwrap_or(true);

        let mut report = ImportReport::default();
        for chunk in array.chunks(batch_size) {
            let mut rows = Vec::with_capacity(chunk.len());
            for value in chunk {
                match json_to_row(value) {
                    Ok(row) => {
                        if validate_schema {
                            if let Err(err) = validate_known_columns_and_unions(self.def, &row) {
                                match conflict_resolution {
                                    ConflictResolution::Fail => return Err(err),
                                    _ => {
                                        report.skipped += 1;
                                        report.errors.push(err.to_string());
                                        continue;
                                    }
                                }
                            }
                        }
                        rows.push(row);
                    }
                    Err(err) => {
                        if conflict_resolution == ConflictResolution::Fail {
                            return Err(err);
                        }
                        report.skipped += 1;
                        report.errors.push(err.to_string());
                    }
                }
            }
            if rows.is_empty() {
                continue;
            }

            let primary_column = self.def.primary_columns().first().map(|c| c.name.clone());
            let outcome = match (conflict_resolution, &primary_column) {
                (ConflictResolution::Replace, Some(pk)) => self.upsert(rows.clone(), std::slice::from_ref(pk), None),
                _ => self.insert(rows.clone()),
            };
            match outcome {
                Ok(()) => report.imported += rows.len(),
                Err(err) if conflict_resolution == ConflictResolution::Fail => return Err(err),
                Err(err) => {
                    report.skipped += rows.len();
                    report.errors.push(err.to_string());
                }
            }
        }
        Ok(report)
    }

    /// `syncWith(sourceTable, {keyColumn, conflictResolution, batchSize, onProgress})` (§4.4).
    /// Chunks `source` into `batchSize`-sized slices, each applied under a
    /// single transaction (mirroring [`Table::bulk_insert`]'s chunking); a
    /// chunk that errors rolls back in full and the error propagates, so
    /// `onProgress` only ever reports fully-committed rows.
    pub fn sync_with(&self, source: &[Row], mut options: SyncOptions<'_>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let total = source.len();
        let batch_size = options.batch_size.max(1);
        let mut processed = 0usize;

        for chunk in source.chunks(batch_size) {
            let chunk_report =
                with_retry(|| self.run_sync_chunk(chunk, &options.key_column, options.conflict_resolution))?;
            report.inserted += chunk_report.inserted;
            report.updated += chunk_report.updated;
            report.skipped += chunk_report.skipped;

            processed += chunk.len();
            if let Some(cb) = options.on_progress.as_mut() {
                cb(processed, total);
            }
        }
        Ok(report)
    }

    fn run_sync_chunk(&self, chunk: &[Row], key_column: &str, strategy: SyncStrategy) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let tx = self.conn.unchecked_transaction()?;

        for source_row in chunk {
            let Some(key_value) = source_row.get(key_column) else {
                report.skipped += 1;
                continue;
            };

            let select_sql = format!("SELECT 1 FROM \"{}\" WHERE \"{key_column}\" = ? LIMIT 1", self.def.name);
            let exists = tx
                .prepare_cached(&select_sql)?
                .exists(params_from_iter(std::iter::once(key_value)))?;

            if !exists {
                validate_insert_row(self.def, source_row)?;
                let (columns, placeholders, params) = insert_fragments(source_row);
                let sql = format!("INSERT INTO \"{}\" ({columns}) VALUES ({placeholders})", self.def.name);
                tx.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
                report.inserted += 1;
                continue;
            }

            match strategy {
                SyncStrategy::Ignore => report.skipped += 1,
                SyncStrategy::Replace => {
                    validate_known_columns_and_unions(self.def, source_row)?;
                    Self::run_sync_update(&tx, &self.def.name, key_column, key_value, source_row)?;
                    report.updated += 1;
                }
                SyncStrategy::Update => {
                    let mut values: Row = source_row.clone();
                    values.remove(key_column);
                    values.retain(|_, v| !v.is_null());
                    if values.is_empty() {
                        report.skipped += 1;
                    } else {
                        validate_known_columns_and_unions(self.def, &values)?;
                        Self::run_sync_update(&tx, &self.def.name, key_column, key_value, &values)?;
                        report.updated += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn run_sync_update(
        tx: &rusqlite::Transaction<'_>,
        table_name: &str,
        key_column: &str,
        key_value: &LogicalValue,
        values: &Row,
    ) -> Result<()> {
        let set_clause = values.keys().map(|c| format!("\"{c}\" = ?")).collect::<Vec<_>>().join(", ");
        let sql = format!("UPDATE \"{table_name}\" SET {set_clause} WHERE \"{key_column}\" = ?");
        let mut params: Vec<LogicalValue> = values.values().cloned().collect();
        params.push(key_value.clone());
        tx.prepare_cached(&sql)?.execute(params_from_iter(params.iter()))?;
        Ok(())
    }

    /// `rawQuery(sql, params?) → [row]` (§4.4). Decoded against this table's
    /// schema only when `sql` mentions the table's name (case-insensitive);
    /// otherwise values pass through unchanged.
    pub fn raw_query(&self, sql: &str, params: &[LogicalValue]) -> Result<Vec<Row>> {
        let mentions_table = sql.to_lowercase().contains(&self.def.name.to_lowercase());
        with_retry(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |r| {
                    if mentions_table {
                        decode_row(self.def, r)
                    } else {
                        decode_row_untyped(r)
                    }
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// `getTableStats() → {name, recordCount, columns, indexes, estimatedSize}` (§4.4).
    pub fn get_table_stats(&self) -> Result<TableStats> {
        let record_count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.def.name), [], |r| r.get(0))?;

        let columns = self
            .def
            .columns
            .iter()
            .map(|c| ColumnStat {
                name: c.name.clone(),
                column_type: c.kind.storage_type().to_string(),
                nullable: c.is_nullable(),
                primary: c.is_primary(),
            })
            .collect();

        let mut index_stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL",
        )?;
        let indexes: Vec<String> = index_stmt
            .query_map([&self.def.name], |r| r.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        drop(index_stmt);

        let page_count: i64 = self.conn.query_row("PRAGMA page_count", [], |r| r.get(0)).unwrap_or(0);
        let page_size: i64 = self.conn.query_row("PRAGMA page_size", [], |r| r.get(0)).unwrap_or(4096);
        let estimated_size = format_bytes(page_count.saturating_mul(page_size));

        Ok(TableStats { name: self.def.name.clone(), record_count, columns, indexes, estimated_size })
    }
}

fn insert_fragments(row: &Row) -> (String, String, Vec<LogicalValue>) {
    let columns = row.keys().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
    let placeholders = row.keys().map(|_| "?").collect::<Vec<_>>().join(", ");
    let params: Vec<LogicalValue> = row.values().cloned().collect();
    (columns, placeholders, params)
}

fn decode_row_untyped(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (idx, name) in row.as_ref().column_names().iter().enumerate() {
        out.insert((*name).to_string(), crate::codec::decode_untyped(row.get_ref(idx)?));
    }
    Ok(out)
}

fn row_to_json(row: &Row) -> serde_json::Value {
    let mut map = serde_json::Map::with_capacity(row.len());
    for (key, value) in row {
        map.insert(key.clone(), logical_value_to_json(value));
    }
    serde_json::Value::Object(map)
}

fn logical_value_to_json(value: &LogicalValue) -> serde_json::Value {
    match value {
        LogicalValue::Null => serde_json::Value::Null,
        LogicalValue::Int(v) => serde_json::json!(v),
        LogicalValue::Real(v) => serde_json::json!(v),
        LogicalValue::Text(v) => serde_json::json!(v),
        LogicalValue::Bool(v) => serde_json::json!(v),
        LogicalValue::Date(v) => serde_json::json!(v.timestamp_millis()),
        LogicalValue::Json(v) => v.clone(),
    }
}

fn json_to_row(value: &serde_json::Value) -> Result<Row> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::invalid_argument("each imported row must be a JSON object"))?;
    let mut row = Row::new();
    for (key, value) in object {
        row.insert(key.clone(), json_to_logical_value(value));
    }
    Ok(row)
}

fn json_to_logical_value(value: &serde_json::Value) -> LogicalValue {
    match value {
        serde_json::Value::Null => LogicalValue::Null,
        serde_json::Value::Bool(v) => LogicalValue::Bool(*v),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(
            || LogicalValue::Real(n.as_f64().unwrap_or_default()),
            LogicalValue::Int,
        ),
        serde_json::Value::String(s) => LogicalValue::Text(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => LogicalValue::Json(value.clone()),
    }
}

fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}
