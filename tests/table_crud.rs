mod common;

use sqlit::table::SelectOptions;
use sqlit::{LogicalValue, Predicate, Row};
use std::collections::BTreeMap;

fn row(pairs: &[(&str, LogicalValue)]) -> Row {
    let mut r = BTreeMap::new();
    for (k, v) in pairs {
        r.insert((*k).to_string(), v.clone());
    }
    r
}

fn by_id(id: i64) -> SelectOptions {
    SelectOptions { predicate: Predicate::new().eq("id", LogicalValue::Int(id)), ..Default::default() }
}

#[test]
fn insert_select_update_delete_round_trip() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    users.insert(vec![row(&[("email", LogicalValue::Text("a@example.com".into()))])]).expect("insert");

    let found = users
        .find_first(SelectOptions { predicate: Predicate::new().eq("email", LogicalValue::Text("a@example.com".into())), ..Default::default() })
        .expect("find_first")
        .expect("row present");
    assert_eq!(found.get("email"), Some(&LogicalValue::Text("a@example.com".into())));
    // defaults applied
    assert_eq!(found.get("role"), Some(&LogicalValue::Text("user".into())));
    assert_eq!(found.get("is_active"), Some(&LogicalValue::Bool(true)));

    let id = match found.get("id") {
        Some(LogicalValue::Int(i)) => *i,
        other => panic!("expected int id, got {other:?}"),
    };

    let updated = users
        .update(Predicate::new().eq("id", LogicalValue::Int(id)), row(&[("role", LogicalValue::Text("admin".into()))]))
        .expect("update");
    assert_eq!(updated, 1);

    let after = users.find_first(by_id(id)).unwrap().unwrap();
    assert_eq!(after.get("role"), Some(&LogicalValue::Text("admin".into())));

    let deleted = users.delete(Predicate::new().eq("id", LogicalValue::Int(id))).expect("delete");
    assert_eq!(deleted, 1);
    assert!(!users.exists(Predicate::new().eq("id", LogicalValue::Int(id))).unwrap());
}

#[test]
fn union_constraint_violation_is_rejected_on_insert() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    let err = users
        .insert(vec![row(&[
            ("email", LogicalValue::Text("b@example.com".into())),
            ("role", LogicalValue::Text("superuser".into())),
        ])])
        .unwrap_err();
    assert!(matches!(err, sqlit::StoreError::UnionConstraintViolation { .. }));
}

#[test]
fn update_and_delete_require_a_meaningful_predicate() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    users.insert(vec![row(&[("email", LogicalValue::Text("c@example.com".into()))])]).unwrap();

    let update_err = users.update(Predicate::new(), row(&[("role", LogicalValue::Text("admin".into()))])).unwrap_err();
    assert!(matches!(update_err, sqlit::StoreError::MissingPredicate { .. }));

    let delete_err = users.delete(Predicate::new()).unwrap_err();
    assert!(matches!(delete_err, sqlit::StoreError::MissingPredicate { .. }));
}

#[test]
fn bulk_insert_preserves_row_order_and_count() {
    let (manager, _dir) = common::test_manager();
    let posts = manager.table("posts").expect("table");

    let rows: Vec<Row> = (0..5)
        .map(|i| {
            row(&[
                ("author_id", LogicalValue::Int(1)),
                ("title", LogicalValue::Text(format!("post-{i}"))),
            ])
        })
        .collect();

    let ids = posts.bulk_insert(rows, None).expect("bulk_insert");
    assert_eq!(ids.len(), 5);
    assert_eq!(posts.count(Predicate::new()).unwrap(), 5);

    for (i, id) in ids.iter().enumerate() {
        let r = posts.find_first(by_id(*id)).unwrap().unwrap();
        assert_eq!(r.get("title"), Some(&LogicalValue::Text(format!("post-{i}"))));
    }
}

#[test]
fn upsert_updates_conflicting_row_in_place() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    users.insert(vec![row(&[("email", LogicalValue::Text("dup@example.com".into()))])]).unwrap();

    users
        .upsert(
            vec![row(&[
                ("email", LogicalValue::Text("dup@example.com".into())),
                ("role", LogicalValue::Text("admin".into())),
            ])],
            &["email".to_string()],
            None,
        )
        .expect("upsert");

    assert_eq!(users.count(Predicate::new()).unwrap(), 1);
    let r = users
        .find_first(SelectOptions { predicate: Predicate::new().eq("email", LogicalValue::Text("dup@example.com".into())), ..Default::default() })
        .unwrap()
        .unwrap();
    assert_eq!(r.get("role"), Some(&LogicalValue::Text("admin".into())));
}

#[test]
fn nullable_column_accepts_explicit_null() {
    let (manager, _dir) = common::test_manager();
    let posts = manager.table("posts").expect("table");

    let ids = posts
        .bulk_insert(
            vec![row(&[
                ("author_id", LogicalValue::Int(2)),
                ("title", LogicalValue::Text("no body".into())),
                ("body", LogicalValue::Null),
            ])],
            None,
        )
        .expect("insert with null");

    let r = posts.find_first(by_id(ids[0])).unwrap().unwrap();
    assert_eq!(r.get("body"), Some(&LogicalValue::Null));
}
