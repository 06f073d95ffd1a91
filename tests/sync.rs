mod common;

use sqlit::table::{SyncOptions, SyncStrategy};
use sqlit::{LogicalValue, Row};
use std::collections::BTreeMap;

fn row(pairs: &[(&str, LogicalValue)]) -> Row {
    let mut r = BTreeMap::new();
    for (k, v) in pairs {
        r.insert((*k).to_string(), v.clone());
    }
    r
}

#[test]
fn sync_with_inserts_new_rows_across_multiple_batches() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    let source: Vec<Row> = (0..25)
        .map(|i| row(&[("email", LogicalValue::Text(format!("user{i}@example.com")))]))
        .collect();

    let report = users
        .sync_with(
            &source,
            SyncOptions { key_column: "email".into(), conflict_resolution: SyncStrategy::Ignore, batch_size: 10, on_progress: None },
        )
        .expect("sync_with");

    assert_eq!(report.inserted, 25);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 0);
    assert_eq!(users.count(sqlit::Predicate::new()).expect("count"), 25);
}

#[test]
fn sync_with_replace_updates_existing_rows_in_batches() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    let seed: Vec<Row> = (0..12)
        .map(|i| row(&[("email", LogicalValue::Text(format!("user{i}@example.com"))), ("role", LogicalValue::Text("user".into()))]))
        .collect();
    users.insert(seed).expect("seed insert");

    let source: Vec<Row> = (0..12)
        .map(|i| {
            row(&[
                ("email", LogicalValue::Text(format!("user{i}@example.com"))),
                ("role", LogicalValue::Text("admin".into())),
            ])
        })
        .collect();

    let mut progress_calls = Vec::new();
    let mut on_progress = |done: usize, total: usize| progress_calls.push((done, total));

    let report = users
        .sync_with(
            &source,
            SyncOptions {
                key_column: "email".into(),
                conflict_resolution: SyncStrategy::Replace,
                batch_size: 5,
                on_progress: Some(&mut on_progress),
            },
        )
        .expect("sync_with");

    assert_eq!(report.updated, 12);
    assert_eq!(report.inserted, 0);
    // three chunks of 5, 5, 2 against a batch_size of 5 over 12 rows
    assert_eq!(progress_calls, vec![(5, 12), (10, 12), (12, 12)]);

    let rows = users.select(sqlit::table::SelectOptions::default()).expect("select");
    assert!(rows.iter().all(|r| r.get("role") == Some(&LogicalValue::Text("admin".into()))));
}

#[test]
fn sync_with_update_strategy_skips_rows_with_no_non_key_fields() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    users.insert(vec![row(&[("email", LogicalValue::Text("seed@example.com".into()))])]).expect("seed insert");

    let source = vec![row(&[("email", LogicalValue::Text("seed@example.com".into()))])];

    let report = users
        .sync_with(
            &source,
            SyncOptions { key_column: "email".into(), conflict_resolution: SyncStrategy::Update, batch_size: 1000, on_progress: None },
        )
        .expect("sync_with");

    assert_eq!(report.skipped, 1);
    assert_eq!(report.updated, 0);
}
