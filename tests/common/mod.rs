#![allow(dead_code)]

use sqlit::{Column, ColumnKind, DatabaseManager, Schema, TableDef};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(sqlit::logging::init_test);
}

/// A two-table fixture schema (`users`, `posts`) exercised by most
/// integration tests: an autoincrement primary key, a unique column, a
/// union-constrained column with a default, and a nullable foreign key.
pub fn fixture_schema() -> Schema {
    let users = TableDef::new(
        "users",
        vec![
            Column::new("id", ColumnKind::Int { auto_increment: true, union: None, default: None }).primary(),
            Column::new("email", ColumnKind::Text { union: None, default: None }).unique(),
            Column::new(
                "role",
                ColumnKind::Text { union: Some(vec!["admin".into(), "user".into()]), default: Some("user".into()) },
            ),
            Column::new("is_active", ColumnKind::Bool { default: Some(true) }),
        ],
    );

    let posts = TableDef::new(
        "posts",
        vec![
            Column::new("id", ColumnKind::Int { auto_increment: true, union: None, default: None }).primary(),
            Column::new("author_id", ColumnKind::Int { auto_increment: false, union: None, default: None }),
            Column::new("title", ColumnKind::Text { union: None, default: None }),
            Column::new("body", ColumnKind::Text { union: None, default: None }).nullable(),
        ],
    );

    Schema::new(vec![users, posts])
}

/// An on-disk manager over the fixture schema, plus the `TempDir` keeping
/// the database file alive for the duration of the test.
pub fn test_manager() -> (DatabaseManager, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("fixture.sqlite3");
    let manager = DatabaseManager::connect(path, fixture_schema(), None).expect("connect");
    (manager, dir)
}

/// An on-disk manager with a pool attached, for pool-exercising tests.
pub fn test_manager_with_pool(config: sqlit::pool::config::PoolConfig) -> (DatabaseManager, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("fixture.sqlite3");
    let manager = DatabaseManager::connect(path, fixture_schema(), Some(config)).expect("connect");
    (manager, dir)
}
