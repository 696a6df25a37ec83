//! Bulk Transaction Tests
//!
//! A batch either applies completely (one journal batch) or not at all
//! (state unchanged, nothing journaled).

use crate::common::*;

fn fields(value: Value) -> folio::Fields {
    value.as_object().cloned().unwrap()
}

#[test]
fn failing_batch_changes_nothing() {
    let test_db = TestDb::new();
    let db = test_db.db();
    seed(db, "books", vec![json!({"title": "Dune"})]);
    let before = state_bytes(db);
    let lines_before = test_db.journal_lines();

    let err = db
        .bulk(
            "books",
            vec![
                BulkOp::Insert { doc: fields(json!({"title": "A"})) },
                BulkOp::Insert { doc: fields(json!({"title": "B"})) },
                BulkOp::Delete { id: "missing".into() },
            ],
        )
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, Error::Bulk { index: 2, .. }));
    assert_eq!(state_bytes(db), before);
    assert_eq!(test_db.journal_lines(), lines_before);
    assert_eq!(db.count("books", &Filter::All), 1);
}

#[test]
fn failing_batch_survives_crash_unchanged() {
    let mut test_db = TestDb::new();
    seed(test_db.db(), "books", vec![json!({"title": "Dune"})]);
    let before = state_bytes(test_db.db());

    test_db
        .db()
        .bulk(
            "books",
            vec![
                BulkOp::Insert { doc: fields(json!({"title": "A"})) },
                BulkOp::Merge { id: "missing".into(), doc: fields(json!({})) },
            ],
        )
        .unwrap_err();

    test_db.crash_and_reopen();
    assert_eq!(state_bytes(test_db.db()), before);
}

#[test]
fn successful_batch_is_one_journal_write() {
    let mut test_db = TestDb::new();
    let docs = seed(test_db.db(), "books", vec![json!({"title": "Dune"}), json!({"title": "Emma"})]);
    let lines_before = test_db.journal_lines();

    let results = test_db
        .db()
        .bulk(
            "books",
            vec![
                BulkOp::Insert { doc: fields(json!({"title": "Foundation"})) },
                BulkOp::Replace { id: docs[0].id().into(), doc: fields(json!({"title": "Dune!"})) },
                BulkOp::Merge { id: docs[1].id().into(), doc: fields(json!({"year": 1815})) },
                BulkOp::Delete { id: docs[0].id().into() },
            ],
        )
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(matches!(results[0], OpResult::Insert { .. }));
    assert!(matches!(results[1], OpResult::Replace { .. }));
    assert_eq!(results[2].document().unwrap().get("year"), Some(&json!(1815)));
    assert_eq!(results[3], OpResult::Delete { id: docs[0].id().to_string() });
    assert_eq!(test_db.journal_lines(), lines_before + 4);

    let expected = state_bytes(test_db.db());
    test_db.crash_and_reopen();
    assert_eq!(state_bytes(test_db.db()), expected);
}

#[test]
fn later_ops_see_earlier_ops() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let doc = db.insert("c", json!({"n": 1})).unwrap();

    let results = db
        .bulk(
            "c",
            vec![
                BulkOp::Merge { id: doc.id().into(), doc: fields(json!({"a": 1})) },
                BulkOp::Merge { id: doc.id().into(), doc: fields(json!({"b": 2})) },
            ],
        )
        .unwrap();

    assert_eq!(
        Value::Object(results[1].document().unwrap().fields().clone()),
        json!({"n": 1, "a": 1, "b": 2})
    );
}

#[test]
fn wire_batch_parsing() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let doc = db.insert("c", json!({"n": 1})).unwrap();

    let ops = BulkOp::parse_batch(json!([
        {"op": "insert", "doc": {"n": 2}},
        {"op": "patch", "id": doc.id(), "doc": {"m": true}},
    ]))
    .unwrap();
    db.bulk("c", ops).unwrap();
    assert_eq!(db.count("c", &Filter::All), 2);

    let err = BulkOp::parse_batch(json!([{"op": "update", "doc": {}}])).unwrap_err();
    assert!(err.is_invalid_input());
}

#[test]
fn concurrent_readers_never_see_partial_batches() {
    let test_db = TestDb::new();
    let db = test_db.db();

    std::thread::scope(|scope| {
        let writer = scope.spawn(|| {
            for _ in 0..50 {
                let ops = (0..10)
                    .map(|i| BulkOp::Insert { doc: fields(json!({"i": i})) })
                    .collect();
                db.bulk("c", ops).unwrap();
            }
        });

        while !writer.is_finished() {
            let count = db.count("c", &Filter::All);
            assert_eq!(count % 10, 0, "observed a partial batch: {}", count);
        }
    });

    assert_eq!(db.count("c", &Filter::All), 500);
}
