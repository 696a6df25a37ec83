//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::fs::{self, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Once;

pub use folio::{
    BulkOp, Database, DatabaseState, Document, Error, ExportFormat, Filter, FolioConfig,
    ImportFormat, OpResult, QueryOptions, QueryResult, SortSpec,
};
pub use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route library logs to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TestDb - database wrapper with reopen and crash simulation
// ============================================================================

/// Test database in a temporary directory.
///
/// Auto-compaction is off unless a test turns it on, so journal contents are
/// predictable.
pub struct TestDb {
    db: Option<Database>,
    pub dir: TempDir,
}

impl TestDb {
    /// Fresh database with standard durability.
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = open_quiet(dir.path());
        TestDb { db: Some(db), dir }
    }

    /// Fresh database that fsyncs every journal append.
    pub fn new_strict() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Database::builder()
            .path(dir.path())
            .always()
            .no_auto_compaction()
            .open()
            .expect("Failed to open strict database");
        TestDb { db: Some(db), dir }
    }

    /// The open database.
    pub fn db(&self) -> &Database {
        self.db.as_ref().expect("database is closed")
    }

    /// Clean shutdown (final compaction) followed by a fresh open.
    pub fn reopen(&mut self) {
        drop(self.db.take());
        self.db = Some(open_quiet(self.dir.path()));
    }

    /// Simulate a crash: the database disappears without shutting down, so
    /// nothing is compacted and recovery must replay the journal.
    pub fn crash_and_reopen(&mut self) {
        if let Some(db) = self.db.take() {
            std::mem::forget(db);
        }
        self.db = Some(open_quiet(self.dir.path()));
    }

    /// Close the database without reopening.
    pub fn close(&mut self) {
        drop(self.db.take());
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.path().join("journal.ndjson")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.path().join("snapshot.json")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    /// Number of non-empty lines in the journal.
    pub fn journal_lines(&self) -> usize {
        journal_lines(&self.journal_path())
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

/// Open with auto-compaction disabled.
pub fn open_quiet(path: &Path) -> Database {
    Database::builder()
        .path(path)
        .no_auto_compaction()
        .open()
        .expect("Failed to open test database")
}

// ============================================================================
// File helpers
// ============================================================================

pub fn journal_lines(path: &Path) -> usize {
    match fs::read_to_string(path) {
        Ok(text) => text.lines().filter(|l| !l.trim().is_empty()).count(),
        Err(_) => 0,
    }
}

pub fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("Failed to open file for append");
    file.write_all(bytes).expect("Failed to append");
}

pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Canonical bytes of a database's state.
pub fn state_bytes(db: &Database) -> Vec<u8> {
    db.export(ExportFormat::Snapshot).expect("export failed")
}

/// Insert `docs` into `collection`, returning the stored documents.
pub fn seed(db: &Database, collection: &str, docs: Vec<Value>) -> Vec<Document> {
    docs.into_iter()
        .map(|doc| db.insert(collection, doc).expect("insert failed"))
        .collect()
}

/// Titles of a query page, in order.
pub fn titles(result: &QueryResult) -> Vec<String> {
    result
        .items
        .iter()
        .map(|d| {
            d.get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
