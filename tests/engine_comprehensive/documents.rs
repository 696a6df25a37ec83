//! Document Operation Tests
//!
//! Insert/get/replace/merge/remove through the public Database API.

use crate::common::*;

#[test]
fn insert_ignores_caller_metadata() {
    let test_db = TestDb::new();
    let db = test_db.db();

    let doc = db
        .insert(
            "books",
            json!({"id": "mine", "createdAt": "yesterday", "updatedAt": "never", "title": "Dune"}),
        )
        .unwrap();

    assert_ne!(doc.id(), "mine");
    assert_eq!(doc.id().len(), 32);
    assert_eq!(doc.created_at(), doc.updated_at());
    assert_eq!(doc.fields().len(), 1);
    assert_eq!(db.get("books", doc.id()).unwrap(), doc);
}

#[test]
fn ids_are_unique() {
    let test_db = TestDb::new();
    let docs = seed(test_db.db(), "c", (0..200).map(|i| json!({"i": i})).collect());

    let mut ids: Vec<&str> = docs.iter().map(|d| d.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 200);
}

#[test]
fn replace_keeps_identity() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let original = db.insert("books", json!({"title": "Dune", "year": 1965})).unwrap();

    let replaced = db
        .replace("books", original.id(), json!({"title": "Dune Messiah", "id": "hijack"}))
        .unwrap();

    assert_eq!(replaced.id(), original.id());
    assert_eq!(replaced.created_at(), original.created_at());
    assert!(replaced.updated_at() >= original.updated_at());
    assert!(replaced.get("year").is_none());
    assert_eq!(replaced.get("title"), Some(&json!("Dune Messiah")));
}

#[test]
fn merge_semantics() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let doc = db.insert("c", json!({"a": {"x": 1}, "keep": [1, 2]})).unwrap();

    let merged = db.merge("c", doc.id(), json!({"a": {"y": 2}})).unwrap();
    assert_eq!(merged.get("a"), Some(&json!({"x": 1, "y": 2})));
    assert_eq!(merged.get("keep"), Some(&json!([1, 2])));

    let merged = db.merge("c", doc.id(), json!({"keep": [3]})).unwrap();
    assert_eq!(merged.get("keep"), Some(&json!([3])));

    let nulled = db.merge("c", doc.id(), json!({"a": null})).unwrap();
    assert_eq!(nulled.get("a"), Some(&Value::Null));
    assert_eq!(db.get("c", doc.id()).unwrap(), nulled);
}

#[test]
fn missing_targets_are_not_found() {
    let test_db = TestDb::new();
    let db = test_db.db();

    assert!(db.get("c", "nope").unwrap_err().is_not_found());
    assert!(db.replace("c", "nope", json!({})).unwrap_err().is_not_found());
    assert!(db.merge("c", "nope", json!({})).unwrap_err().is_not_found());
    assert!(db.remove("c", "nope").unwrap_err().is_not_found());

    // Failed mutations neither create collections nor reach the journal
    assert!(db.list_collections().is_empty());
    assert_eq!(test_db.journal_lines(), 0);
}

#[test]
fn remove_then_get_is_not_found() {
    let test_db = TestDb::new();
    let db = test_db.db();
    let doc = db.insert("c", json!({})).unwrap();

    db.remove("c", doc.id()).unwrap();
    assert!(db.get("c", doc.id()).unwrap_err().is_not_found());
    assert!(db.remove("c", doc.id()).unwrap_err().is_not_found());
}

#[test]
fn list_collections_is_sorted() {
    let test_db = TestDb::new();
    let db = test_db.db();
    for name in ["zebra", "apple", "mango"] {
        db.insert(name, json!({})).unwrap();
    }
    assert_eq!(db.list_collections(), vec!["apple", "mango", "zebra"]);
}

#[test]
fn every_mutation_is_one_journal_line() {
    let test_db = TestDb::new();
    let db = test_db.db();

    let doc = db.insert("c", json!({"n": 1})).unwrap();
    db.replace("c", doc.id(), json!({"n": 2})).unwrap();
    db.merge("c", doc.id(), json!({"m": 3})).unwrap();
    db.remove("c", doc.id()).unwrap();

    assert_eq!(test_db.journal_lines(), 4);
    let text = std::fs::read_to_string(test_db.journal_path()).unwrap();
    let types: Vec<String> = text
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["insert", "update", "update", "delete"]);
}
