//! Replay Equivalence Tests
//!
//! Recovered state (snapshot + journal replay) must equal the state the
//! database held in memory, and recovery must be deterministic.

use crate::common::*;

/// A mixed workload touching several collections.
fn workload(db: &Database) {
    let books = seed(
        db,
        "books",
        vec![
            json!({"title": "Dune", "year": 1965, "meta": {"pages": 412}}),
            json!({"title": "Foundation", "year": 1951}),
            json!({"title": "Hyperion", "year": 1989}),
        ],
    );
    seed(db, "authors", vec![json!({"name": "Herbert"}), json!({"name": "Asimov"})]);

    db.merge("books", books[0].id(), json!({"meta": {"isbn": "x"}})).unwrap();
    db.replace("books", books[1].id(), json!({"title": "Foundation", "year": 1951, "series": true}))
        .unwrap();
    db.remove("books", books[2].id()).unwrap();
    db.bulk(
        "books",
        vec![
            BulkOp::Insert { doc: json!({"title": "Emma"}).as_object().cloned().unwrap() },
            BulkOp::Delete { id: books[0].id().to_string() },
        ],
    )
    .unwrap();
}

#[test]
fn journal_replay_equals_in_memory_state() {
    let mut test_db = TestDb::new();
    workload(test_db.db());
    let expected = state_bytes(test_db.db());

    test_db.crash_and_reopen();
    assert_eq!(state_bytes(test_db.db()), expected);
    assert!(test_db.db().stats().pending_journal_entries > 0);
}

#[test]
fn snapshot_plus_journal_equals_in_memory_state() {
    let mut test_db = TestDb::new();
    workload(test_db.db());
    test_db.db().compact().unwrap();

    // More work after the snapshot lands in the journal only
    let extra = test_db.db().insert("books", json!({"title": "Neuromancer"})).unwrap();
    test_db.db().merge("books", extra.id(), json!({"year": 1984})).unwrap();
    let expected = state_bytes(test_db.db());

    test_db.crash_and_reopen();
    assert_eq!(state_bytes(test_db.db()), expected);
    assert_eq!(test_db.db().stats().pending_journal_entries, 2);
}

#[test]
fn replay_is_deterministic() {
    let mut test_db = TestDb::new();
    workload(test_db.db());

    test_db.crash_and_reopen();
    let first = state_bytes(test_db.db());
    test_db.crash_and_reopen();
    let second = state_bytes(test_db.db());

    assert_eq!(first, second);
}

#[test]
fn clean_shutdown_compacts_and_reopens_identically() {
    let mut test_db = TestDb::new();
    workload(test_db.db());
    let expected = state_bytes(test_db.db());

    test_db.reopen();
    assert_eq!(test_db.journal_lines(), 0);
    assert_eq!(std::fs::read(test_db.snapshot_path()).unwrap(), expected);
    assert_eq!(state_bytes(test_db.db()), expected);
}

#[test]
fn compaction_does_not_change_query_results() {
    let test_db = TestDb::new();
    let db = test_db.db();
    workload(db);
    seed(db, "books", (0..20).map(|i| json!({"title": format!("Vol {:02}", i), "n": i})).collect());

    let queries = vec![
        QueryOptions::new(),
        QueryOptions::new().filter(Filter::parse("vol")).sort(SortSpec::desc("n")).limit(5),
        QueryOptions::new().filter(Filter::parse(r#"{"title": "Foundation"}"#)),
        QueryOptions::new().sort(SortSpec::asc("title")).offset(7).limit(3),
    ];
    let before: Vec<QueryResult> = queries.iter().map(|q| db.query("books", q)).collect();

    let info = db.compact().unwrap();
    assert!(info.journal_entries_folded > 0);

    let after: Vec<QueryResult> = queries.iter().map(|q| db.query("books", q)).collect();
    assert_eq!(before, after);
}
