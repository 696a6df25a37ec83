//! Query Engine Tests

use crate::common::*;

fn library(db: &Database) {
    seed(
        db,
        "books",
        vec![
            json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}),
            json!({"title": "Foundation", "author": "Isaac Asimov", "year": 1951}),
        ],
    );
}

#[test]
fn text_search_scenario() {
    let test_db = TestDb::new();
    let db = test_db.db();
    library(db);

    let result = db.query("books", &QueryOptions::from_params([("q", "Dune")]).unwrap());
    assert_eq!(result.total, 1);
    assert_eq!(titles(&result), vec!["Dune"]);

    let result = db.query("books", &QueryOptions::from_params([("q", "ASIMOV")]).unwrap());
    assert_eq!(titles(&result), vec!["Foundation"]);
}

#[test]
fn object_filter_scenario() {
    let test_db = TestDb::new();
    let db = test_db.db();
    library(db);

    let options = QueryOptions::from_params([("q", r#"{"year": 1951}"#)]).unwrap();
    assert_eq!(titles(&db.query("books", &options)), vec!["Foundation"]);

    let options = QueryOptions::from_params([("q", r#"{"year": 1951, "title": "Dune"}"#)]).unwrap();
    assert_eq!(db.query("books", &options).total, 0);
}

#[test]
fn pagination_over_sorted_titles() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let names = ["j", "c", "h", "a", "e", "b", "i", "d", "g", "f"];
    seed(db, "c", names.iter().map(|t| json!({"title": t})).collect());

    let options = QueryOptions::from_params([("sort", "title"), ("offset", "3"), ("limit", "4")]).unwrap();
    let result = db.query("c", &options);

    assert_eq!(result.total, 10);
    assert_eq!(titles(&result), vec!["d", "e", "f", "g"]);
}

#[test]
fn descending_sort_on_metadata() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let docs = seed(db, "c", (0..5).map(|i| json!({"title": format!("{}", i)})).collect());

    let result = db.query("c", &QueryOptions::new().sort(SortSpec::desc("createdAt")));
    let mut expected: Vec<_> = docs.iter().map(|d| d.created_at()).collect();
    expected.sort_by(|a, b| b.cmp(a));

    // Timestamps can tie at clock resolution, so compare them rather than ids
    let actual: Vec<_> = result.items.iter().map(|d| d.created_at()).collect();
    assert_eq!(actual, expected);
}

#[test]
fn missing_values_sort_last_both_ways() {
    let test_db = TestDb::new();
    let db = test_db.db();
    seed(
        db,
        "c",
        vec![
            json!({"title": "no rank"}),
            json!({"title": "rank 2", "rank": 2}),
            json!({"title": "rank 1", "rank": 1}),
        ],
    );

    let asc = db.query("c", &QueryOptions::new().sort(SortSpec::asc("rank")));
    assert_eq!(titles(&asc), vec!["rank 1", "rank 2", "no rank"]);

    let desc = db.query("c", &QueryOptions::new().sort(SortSpec::desc("rank")));
    assert_eq!(titles(&desc), vec!["rank 2", "rank 1", "no rank"]);
}

#[test]
fn invalid_parameters_are_rejected() {
    for params in [
        [("limit", "-5")],
        [("offset", "ten")],
        [("sort", "title:up")],
        [("sort", ":desc")],
    ] {
        let err = QueryOptions::from_params(params).unwrap_err();
        assert!(err.is_invalid_input());
    }
}

#[test]
fn missing_collection_is_empty_page() {
    let test_db = TestDb::new();
    let result = test_db.db().query("nothing", &QueryOptions::new());
    assert_eq!(result.total, 0);
    assert!(result.items.is_empty());
}

#[test]
fn count_matches_query_total() {
    let test_db = TestDb::new();
    let db = test_db.db();
    seed(db, "c", (0..30).map(|i| json!({"even": i % 2 == 0})).collect());

    let filter = Filter::parse(r#"{"even": true}"#);
    assert_eq!(db.count("c", &filter), 15);
    assert_eq!(db.query("c", &QueryOptions::new().filter(filter).limit(1)).total, 15);
}
