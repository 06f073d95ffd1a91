mod common;

use sqlit::predicate::Comparison;
use sqlit::table::{Direction, OrderBy, PaginateOptions, SelectOptions};
use sqlit::{LogicalValue, Predicate, Row};
use std::collections::BTreeMap;

fn row(pairs: &[(&str, LogicalValue)]) -> Row {
    let mut r = BTreeMap::new();
    for (k, v) in pairs {
        r.insert((*k).to_string(), v.clone());
    }
    r
}

fn seed_posts(manager: &sqlit::DatabaseManager, count: i64) {
    let posts = manager.table("posts").expect("table");
    let rows: Vec<Row> = (0..count)
        .map(|i| {
            row(&[
                ("author_id", LogicalValue::Int(1)),
                ("title", LogicalValue::Text(format!("post-{i:02}"))),
            ])
        })
        .collect();
    posts.bulk_insert(rows, None).expect("seed");
}

#[test]
fn or_combined_with_top_level_and_clause_selects_matching_rows() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");

    users
        .insert(vec![
            row(&[("email", LogicalValue::Text("admin@example.com".into())), ("role", LogicalValue::Text("admin".into()))]),
            row(&[("email", LogicalValue::Text("user1@example.com".into()))]),
            row(&[("email", LogicalValue::Text("user2@example.com".into()))]),
        ])
        .unwrap();

    let predicate = Predicate::new().eq("is_active", LogicalValue::Bool(true)).or(vec![
        Predicate::new().eq("role", LogicalValue::Text("admin".into())),
        Predicate::new().like("email", "user1%".to_string()),
    ]);

    let results = users.select(SelectOptions { predicate, ..Default::default() }).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn explicit_empty_or_short_circuits_select_without_touching_the_database() {
    let (manager, _dir) = common::test_manager();
    let users = manager.table("users").expect("table");
    users.insert(vec![row(&[("email", LogicalValue::Text("x@example.com".into()))])]).unwrap();

    let predicate = Predicate::new().eq("email", LogicalValue::Text("x@example.com".into())).or(vec![]);
    let results = users.select(SelectOptions { predicate, ..Default::default() }).unwrap();
    assert!(results.is_empty());
}

#[test]
fn comparison_operators_filter_correctly() {
    let (manager, _dir) = common::test_manager();
    seed_posts(&manager, 10);
    let posts = manager.table("posts").expect("table");

    let predicate = Predicate::new().compare("id", Comparison::GreaterThanOrEqual, LogicalValue::Int(8));
    let results = posts.select(SelectOptions { predicate, ..Default::default() }).unwrap();
    assert_eq!(results.len(), 3); // ids 8, 9, 10
}

#[test]
fn paginate_returns_correct_page_and_metadata() {
    let (manager, _dir) = common::test_manager();
    seed_posts(&manager, 25);
    let posts = manager.table("posts").expect("table");

    let page = posts
        .paginate(PaginateOptions {
            page: 2,
            page_size: 10,
            order_by: Some(OrderBy { column: "id".to_string(), direction: Direction::Asc }),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(page.total, 25);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.data.len(), 10);
    assert_eq!(page.data[0].get("title"), Some(&LogicalValue::Text("post-10".into())));
}

#[test]
fn paginate_out_of_range_page_returns_empty_data_with_metadata_intact() {
    let (manager, _dir) = common::test_manager();
    seed_posts(&manager, 5);
    let posts = manager.table("posts").expect("table");

    let page = posts.paginate(PaginateOptions { page: 99, page_size: 10, ..Default::default() }).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 1);
}
