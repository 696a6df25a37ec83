//! Backup and Restore Tests

use crate::common::*;

#[test]
fn backup_then_restore_is_byte_for_byte() {
    let mut test_db = TestDb::new();
    let docs = seed(
        test_db.db(),
        "books",
        vec![json!({"title": "Dune", "tags": ["sf", "classic"]}), json!({"title": "Emma"})],
    );
    let expected = state_bytes(test_db.db());
    let backup = test_db.db().backup().unwrap();

    // Diverge after the backup
    test_db.db().remove("books", docs[0].id()).unwrap();
    test_db.db().insert("authors", json!({"name": "Austen"})).unwrap();
    assert_ne!(state_bytes(test_db.db()), expected);

    test_db.db().restore(&backup).unwrap();
    assert_eq!(state_bytes(test_db.db()), expected);

    // Restore compacts: the snapshot holds the restored state, the journal is empty
    assert_eq!(std::fs::read(test_db.snapshot_path()).unwrap(), expected);
    assert_eq!(test_db.journal_lines(), 0);
    assert_eq!(test_db.db().stats().pending_journal_entries, 0);

    test_db.crash_and_reopen();
    assert_eq!(state_bytes(test_db.db()), expected);
}

#[test]
fn backup_does_not_touch_live_files() {
    let test_db = TestDb::new();
    seed(test_db.db(), "c", vec![json!({"n": 1}), json!({"n": 2})]);
    let journal_before = std::fs::read(test_db.journal_path()).unwrap();

    test_db.db().backup().unwrap();

    assert_eq!(std::fs::read(test_db.journal_path()).unwrap(), journal_before);
    assert!(!test_db.snapshot_path().exists());
    assert_eq!(test_db.db().stats().pending_journal_entries, 2);
}

#[test]
fn backups_are_listed_chronologically() {
    let test_db = TestDb::new();
    let db = test_db.db();

    let mut written = Vec::new();
    for i in 0..3 {
        db.insert("c", json!({"i": i})).unwrap();
        written.push(db.backup().unwrap());
    }

    let listed = db.list_backups().unwrap();
    assert_eq!(listed, written);
    for path in &listed {
        assert!(path.starts_with(test_db.backups_dir()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup-") && name.ends_with(".json.zst"));
    }

    // The first backup holds only the first document
    db.restore(&listed[0]).unwrap();
    assert_eq!(db.count("c", &Filter::All), 1);
}

#[test]
fn corrupt_backup_is_rejected_without_change() {
    let test_db = TestDb::new();
    let db = test_db.db();
    seed(db, "c", vec![json!({"n": 1})]);
    let before = state_bytes(db);

    let bogus = test_db.backups_dir().join("backup-bogus.json.zst");
    std::fs::write(&bogus, b"definitely not zstd").unwrap();

    let err = db.restore(&bogus).unwrap_err();
    assert!(matches!(err, Error::Compression(_)));
    assert_eq!(state_bytes(db), before);
}

#[test]
fn backup_level_comes_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = FolioConfig {
        backup_compression_level: 19,
        compaction_interval_ms: 0,
        ..FolioConfig::default()
    };
    let db = Database::open_with_config(dir.path(), config).unwrap();
    seed(&db, "c", (0..50).map(|i| json!({"text": "repetitive ".repeat(20), "i": i})).collect());

    let path = db.backup().unwrap();
    let raw = state_bytes(&db);
    assert!(file_size(&path) < raw.len() as u64);
}

#[test]
fn inconsistent_backup_is_rejected_without_change() {
    let test_db = TestDb::new();
    let db = test_db.db();
    seed(db, "c", vec![json!({"n": 1})]);
    let before = state_bytes(db);

    let ts = "2024-01-01T00:00:00.000000000Z";
    let payloads = [
        // Stored under a key that is not its id
        format!(r#"{{"collections":{{"c":{{"k":{{"id":"other","createdAt":"{ts}","updatedAt":"{ts}"}}}}}}}}"#),
        // Updated before it was created
        r#"{"collections":{"c":{"k":{"id":"k","createdAt":"2024-06-01T00:00:00Z","updatedAt":"2020-01-01T00:00:00Z"}}}}"#.to_string(),
    ];
    for (i, payload) in payloads.iter().enumerate() {
        let path = test_db.backups_dir().join(format!("backup-inconsistent-{}.json.zst", i));
        std::fs::write(&path, zstd::encode_all(payload.as_bytes(), 3).unwrap()).unwrap();

        assert!(db.restore(&path).unwrap_err().is_invalid_input());
        assert_eq!(state_bytes(db), before);
    }
}
