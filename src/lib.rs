//! `sqlit` — a typed embedded-SQL data-access layer and connection pool
//! built over an embedded relational engine (SQLite, via `rusqlite`).
//!
//! # Architecture
//!
//! - [`schema`] — declarative table/column descriptors, DDL emission,
//!   JSON-shape validation, and schema export/import.
//! - [`value`] — the logical value model (`LogicalValue`, `Row`) shared by
//!   every other module.
//! - [`codec`] — row encode/decode between `LogicalValue` and the engine.
//! - [`predicate`] — the structured-predicate-to-SQL compiler.
//! - [`retry`] — the locked-database retry policy.
//! - [`pool`] — the connection pool.
//! - [`table`] — the per-table CRUD/bulk/pagination/JSON façade and its
//!   fluent query builder.
//! - [`manager`] — database lifecycle: connect, backup/restore, merge,
//!   transactions, optimize, stats, integrity.
//! - [`registry`] — the process-wide registry of open pools.
//! - [`config`] — layered pool configuration resolution.
//! - [`logging`] — `tracing` subscriber setup.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod pool;
pub mod predicate;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod table;
pub mod value;

pub use error::{Result, StoreError};
pub use manager::DatabaseManager;
pub use predicate::Predicate;
pub use schema::{Column, ColumnFlags, ColumnKind, Schema, Table as TableDef};
pub use table::{QueryBuilder, Table};
pub use value::{LogicalValue, Row};
