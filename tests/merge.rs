mod common;

use sqlit::manager::{MergeConflictResolution, MergeOptions};
use sqlit::{LogicalValue, Predicate, Row};
use std::collections::BTreeMap;

fn row(pairs: &[(&str, LogicalValue)]) -> Row {
    let mut r = BTreeMap::new();
    for (k, v) in pairs {
        r.insert((*k).to_string(), v.clone());
    }
    r
}

#[test]
fn merge_with_replace_overwrites_conflicting_rows() {
    let (source, source_dir) = common::test_manager();
    source
        .table("users")
        .unwrap()
        .insert(vec![row(&[
            ("email", LogicalValue::Text("shared@example.com".into())),
            ("role", LogicalValue::Text("admin".into())),
        ])])
        .unwrap();

    let (target, _target_dir) = common::test_manager();
    target
        .table("users")
        .unwrap()
        .insert(vec![row(&[("email", LogicalValue::Text("shared@example.com".into()))])])
        .unwrap();

    target
        .merge_database(
            &source_dir.path().join("fixture.sqlite3"),
            MergeOptions { conflict_resolution: Some(MergeConflictResolution::Replace), tables_filter: None },
        )
        .expect("merge");

    let merged = target
        .table("users")
        .unwrap()
        .find_first(sqlit::table::SelectOptions {
            predicate: Predicate::new().eq("email", LogicalValue::Text("shared@example.com".into())),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(merged.get("role"), Some(&LogicalValue::Text("admin".into())));
}

#[test]
fn merge_with_ignore_keeps_existing_rows_on_conflict() {
    let (source, source_dir) = common::test_manager();
    source
        .table("users")
        .unwrap()
        .insert(vec![row(&[
            ("email", LogicalValue::Text("shared@example.com".into())),
            ("role", LogicalValue::Text("admin".into())),
        ])])
        .unwrap();

    let (target, _target_dir) = common::test_manager();
    target
        .table("users")
        .unwrap()
        .insert(vec![row(&[("email", LogicalValue::Text("shared@example.com".into()))])])
        .unwrap();

    target
        .merge_database(
            &source_dir.path().join("fixture.sqlite3"),
            MergeOptions { conflict_resolution: Some(MergeConflictResolution::Ignore), tables_filter: None },
        )
        .expect("merge");

    let merged = target
        .table("users")
        .unwrap()
        .find_first(sqlit::table::SelectOptions {
            predicate: Predicate::new().eq("email", LogicalValue::Text("shared@example.com".into())),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(merged.get("role"), Some(&LogicalValue::Text("user".into())));
}

#[test]
fn analyze_merge_compatibility_reports_matching_schemas_as_compatible() {
    let (source, source_dir) = common::test_manager();
    drop(source);

    let (target, _target_dir) = common::test_manager();
    let report = target.analyze_merge_compatibility(&source_dir.path().join("fixture.sqlite3")).expect("analyze");
    assert_eq!(report.incompatible_tables.len(), 0);
    assert_eq!(report.compatible_tables.len(), 2);
}
