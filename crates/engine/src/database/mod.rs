//! Database struct and open/close logic
//!
//! `Database` ties the pieces together:
//! - Directory layout and `folio.toml`
//! - Recovery on open (snapshot, then journal replay)
//! - Document operations, queries and bulk transactions
//! - Compaction, backup/restore and import/export
//! - The auto-compaction timer and shutdown
//!
//! ## Locking
//!
//! One mutex (the mutation section) owns the journal and the snapshot
//! manager. Every mutation, compaction, backup, restore and import runs
//! inside it. The state itself sits behind an `RwLock`: mutations take the
//! write lock inside the section, readers take only the read lock, so a
//! reader never observes half of a bulk batch.
//!
//! Lock order is always section, then state.
//!
//! ## Mutation ordering
//!
//! A mutation is applied in memory and then appended to the journal, both
//! under the locks. If the append fails the in-memory change is undone
//! before the error is returned, so callers only ever see success for
//! changes that reached the journal.

pub mod builder;
pub mod config;

pub use builder::DatabaseBuilder;
pub use config::FolioConfig;

use crate::bulk::{self, BulkOp, OpResult};
use crate::compaction::{AutoCompactor, CompactionInfo};
use crate::query::{self, Filter, QueryOptions, QueryResult};
use crate::store::{self, Change, DocumentStore};
use crate::transfer::{self, ExportFormat, ImportFormat, ImportPayload};
use folio_core::{DatabaseState, Document, Error, Fields, Result};
use folio_durability::{
    read_backup, BackupManager, DatabasePaths, Journal, JournalEntry, SnapshotManager,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// Stats
// ============================================================================

/// Point-in-time database counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Number of collections
    pub collections: usize,
    /// Number of documents across all collections
    pub documents: usize,
    /// Journal records written since the last compaction
    pub pending_journal_entries: u64,
}

// ============================================================================
// Database Struct
// ============================================================================

/// Journal and snapshot, owned by the mutation section
struct DurableFiles {
    journal: Journal,
    snapshot: SnapshotManager,
}

struct DatabaseInner {
    paths: DatabasePaths,
    config: FolioConfig,
    state: RwLock<DatabaseState>,
    /// The mutation section
    files: Mutex<DurableFiles>,
    backups: BackupManager,
    accepting_mutations: AtomicBool,
}

/// An open document store
///
/// Create one with [`Database::open`] or [`Database::builder`]. All methods
/// take `&self`; wrap the database in an `Arc` to share it between threads.
///
/// # Example
///
/// ```text
/// use folio_engine::{Database, QueryOptions, Filter};
/// use serde_json::json;
///
/// let db = Database::open("/path/to/data")?;
/// db.insert("books", json!({"title": "Dune"}))?;
/// let page = db.query("books", &QueryOptions::new().filter(Filter::parse("dune")));
/// ```
pub struct Database {
    inner: Arc<DatabaseInner>,
    auto_compactor: Mutex<Option<AutoCompactor>>,
}

impl Database {
    /// Open the database at `path` using `folio.toml` from that directory
    ///
    /// The directory and a default config file are created if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        DatabaseBuilder::new().path(path.as_ref()).open()
    }

    /// Open with an explicit configuration
    ///
    /// The supplied config is written to `folio.toml` so that later
    /// `Database::open()` calls pick up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: FolioConfig) -> Result<Self> {
        config.validate()?;
        let paths = DatabasePaths::from_root(path);
        paths.create_directories()?;
        config.write_to_file(&paths.config())?;
        Self::open_with_paths(paths, config)
    }

    /// Builder for opening with programmatic overrides
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn open_with_paths(paths: DatabasePaths, config: FolioConfig) -> Result<Self> {
        config.validate()?;
        let durability = config.durability_mode()?;
        paths.create_directories()?;

        let snapshot = SnapshotManager::new(paths.snapshot());
        if snapshot.cleanup_temp_file()? {
            warn!(target: "folio::database", "Removed leftover temporary snapshot file");
        }
        let base = snapshot.read(DatabaseState::new())?;

        let mut journal = Journal::open(paths.journal(), durability)?;
        let (state, replay) = journal.replay(base)?;
        journal.set_pending(replay.applied + replay.skipped);

        info!(
            target: "folio::database",
            path = %paths.root().display(),
            durability = durability.name(),
            collections = state.collections.len(),
            documents = state.document_count(),
            replayed = replay.applied,
            skipped = replay.skipped,
            "Database opened"
        );

        let backups = BackupManager::new(paths.backups_dir(), config.backup_compression_level);
        let interval = config.compaction_interval();
        let db = Database {
            inner: Arc::new(DatabaseInner {
                paths,
                config,
                state: RwLock::new(state),
                files: Mutex::new(DurableFiles { journal, snapshot }),
                backups,
                accepting_mutations: AtomicBool::new(true),
            }),
            auto_compactor: Mutex::new(None),
        };

        if let Some(interval) = interval {
            db.start_auto_compaction(interval)?;
        }
        Ok(db)
    }

    /// Data directory
    pub fn path(&self) -> &Path {
        self.inner.paths.root()
    }

    /// Effective configuration
    pub fn config(&self) -> &FolioConfig {
        &self.inner.config
    }

    /// True until [`Database::shutdown`] is called
    pub fn is_open(&self) -> bool {
        self.inner.accepting_mutations.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Insert a new document into `collection`
    ///
    /// `doc` must be a JSON object. Any `id`, `createdAt` or `updatedAt` in it
    /// is ignored; the stored document gets a fresh id and timestamps.
    pub fn insert(&self, collection: &str, doc: Value) -> Result<Document> {
        let fields = into_fields(doc)?;
        let change = self.mutate(|store| store.insert(collection, fields))?;
        Ok(stored(change))
    }

    /// Fetch a document
    pub fn get(&self, collection: &str, id: &str) -> Result<Document> {
        let state = self.inner.state.read();
        store::get(&state, collection, id).cloned()
    }

    /// Replace a document's payload, keeping its id and `createdAt`
    pub fn replace(&self, collection: &str, id: &str, doc: Value) -> Result<Document> {
        let fields = into_fields(doc)?;
        let change = self.mutate(|store| store.replace(collection, id, fields))?;
        Ok(stored(change))
    }

    /// Deep-merge `partial` into a document
    pub fn merge(&self, collection: &str, id: &str, partial: Value) -> Result<Document> {
        let partial = into_fields(partial)?;
        let change = self.mutate(|store| store.merge(collection, id, &partial))?;
        Ok(stored(change))
    }

    /// Remove a document
    pub fn remove(&self, collection: &str, id: &str) -> Result<()> {
        self.mutate(|store| store.remove(collection, id))?;
        Ok(())
    }

    /// Collection names, lexicographically sorted
    pub fn list_collections(&self) -> Vec<String> {
        store::list_collections(&self.inner.state.read())
    }

    /// Run a query against `collection`
    pub fn query(&self, collection: &str, options: &QueryOptions) -> QueryResult {
        query::execute(&self.inner.state.read(), collection, options)
    }

    /// Number of documents in `collection` matching `filter`
    pub fn count(&self, collection: &str, filter: &Filter) -> usize {
        query::count(&self.inner.state.read(), collection, filter)
    }

    /// Apply `ops` to `collection` as one all-or-nothing batch
    ///
    /// On failure nothing is applied and nothing is journaled; the error of
    /// a failing operation is wrapped in [`Error::Bulk`] with its index.
    pub fn bulk(&self, collection: &str, ops: Vec<BulkOp>) -> Result<Vec<OpResult>> {
        let mut files = self.inner.files.lock();
        self.inner.check_accepting()?;
        let mut state = self.inner.state.write();
        bulk::execute(&mut state, collection, ops, |entries| {
            files.journal.append_batch(entries)
        })
    }

    /// Apply `change_fn` inside the mutation section and journal the result
    fn mutate<F>(&self, change_fn: F) -> Result<Change>
    where
        F: FnOnce(&mut DocumentStore<'_>) -> Result<Change>,
    {
        let mut files = self.inner.files.lock();
        self.inner.check_accepting()?;
        let mut state = self.inner.state.write();

        let change = change_fn(&mut DocumentStore::new(&mut state))?;
        if let Err(e) = files.journal.append(change.entry()) {
            change.undo(&mut state);
            error!(
                target: "folio::database",
                collection = change.entry().collection(),
                error = %e,
                "Journal append failed; mutation undone"
            );
            return Err(e);
        }
        Ok(change)
    }

    // ========================================================================
    // Compaction
    // ========================================================================

    /// Fold the journal into a fresh snapshot
    pub fn compact(&self) -> Result<CompactionInfo> {
        self.inner.compact()
    }

    /// Start (or restart) the auto-compaction timer
    pub fn start_auto_compaction(&self, interval: Duration) -> Result<()> {
        self.inner.check_accepting()?;
        let mut slot = self.auto_compactor.lock();
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        let weak: Weak<DatabaseInner> = Arc::downgrade(&self.inner);
        let compactor = AutoCompactor::start(interval, move || match weak.upgrade() {
            Some(inner) => inner.compact(),
            None => Ok(CompactionInfo::default()),
        })?;
        *slot = Some(compactor);
        Ok(())
    }

    /// Stop the auto-compaction timer, if running
    pub fn stop_auto_compaction(&self) {
        if let Some(compactor) = self.auto_compactor.lock().take() {
            compactor.stop();
        }
    }

    /// True if the auto-compaction timer is running
    pub fn auto_compaction_running(&self) -> bool {
        self.auto_compactor.lock().is_some()
    }

    /// Force journal records to stable storage
    pub fn sync(&self) -> Result<()> {
        self.inner.files.lock().journal.sync()
    }

    // ========================================================================
    // Backup / Restore
    // ========================================================================

    /// Write a compressed backup of the current state
    ///
    /// Live state, journal and snapshot are untouched.
    pub fn backup(&self) -> Result<PathBuf> {
        let _section = self.inner.files.lock();
        let state = self.inner.state.read();
        self.inner.backups.backup(&state)
    }

    /// Replace the whole state with the contents of a backup
    ///
    /// The restored state is compacted immediately, so the journal is empty
    /// afterwards.
    pub fn restore(&self, file: &Path) -> Result<()> {
        let restored = read_backup(file)?;
        info!(target: "folio::database", file = %file.display(), "Restoring backup");
        self.inner.install_state(restored)
    }

    /// Backup files in chronological order
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        self.inner.backups.list()
    }

    // ========================================================================
    // Import / Export
    // ========================================================================

    /// Import a payload
    ///
    /// A snapshot payload replaces the state (then compacts); NDJSON records
    /// are each inserted as a new document, all-or-nothing, in one journal
    /// batch. Malformed payloads are rejected before any change. Returns the
    /// number of documents imported.
    pub fn import(&self, bytes: &[u8], format: ImportFormat) -> Result<usize> {
        match transfer::parse_import(bytes, format)? {
            ImportPayload::Snapshot(state) => {
                let documents = state.document_count();
                self.inner.install_state(state)?;
                Ok(documents)
            }
            ImportPayload::Records(records) => {
                let mut files = self.inner.files.lock();
                self.inner.check_accepting()?;
                let mut state = self.inner.state.write();
                transfer::apply_records(&mut state, records, |entries| {
                    files.journal.append_batch(entries)
                })
            }
        }
    }

    /// Serialize the current state
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        transfer::export(&self.inner.state.read(), format)
    }

    // ========================================================================
    // Stats / Shutdown
    // ========================================================================

    /// Current counters
    pub fn stats(&self) -> DatabaseStats {
        let files = self.inner.files.lock();
        let state = self.inner.state.read();
        DatabaseStats {
            collections: state.collections.len(),
            documents: state.document_count(),
            pending_journal_entries: files.journal.pending(),
        }
    }

    /// Stop accepting mutations, stop the timer and compact one last time
    ///
    /// A failing final compaction is logged, not returned: the journal still
    /// holds every accepted mutation. Idempotent.
    pub fn shutdown(&self) {
        if !self.inner.accepting_mutations.swap(false, Ordering::SeqCst) {
            return;
        }

        self.stop_auto_compaction();

        match self.inner.compact() {
            Ok(info) => info!(
                target: "folio::database",
                documents = info.documents,
                "Database shut down"
            ),
            Err(e) => error!(
                target: "folio::database",
                error = %e,
                "Final compaction failed; journal kept for replay"
            ),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl DatabaseInner {
    fn check_accepting(&self) -> Result<()> {
        if self.accepting_mutations.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    fn compact(&self) -> Result<CompactionInfo> {
        let mut files = self.files.lock();
        let state = self.state.read();

        let folded = files.journal.pending();
        let snapshot = files.snapshot.write(&state)?;
        files.journal.truncate()?;

        info!(
            target: "folio::compaction",
            collections = snapshot.collections,
            documents = snapshot.documents,
            folded,
            bytes = snapshot.size_bytes,
            "Compaction complete"
        );
        Ok(CompactionInfo {
            collections: snapshot.collections,
            documents: snapshot.documents,
            journal_entries_folded: folded,
            snapshot_bytes: snapshot.size_bytes,
        })
    }

    /// Make `new_state` the durable and in-memory state
    ///
    /// The snapshot is written before the journal is emptied, and memory is
    /// only swapped once both succeeded.
    fn install_state(&self, new_state: DatabaseState) -> Result<()> {
        let mut files = self.files.lock();
        self.check_accepting()?;

        let snapshot = files.snapshot.write(&new_state)?;
        if let Err(e) = files.journal.truncate() {
            // The journal still describes the old state; put the matching
            // snapshot back so a reopen replays to what memory holds.
            let current = self.state.read();
            if let Err(rewrite) = files.snapshot.write(&current) {
                error!(
                    target: "folio::database",
                    error = %rewrite,
                    "Failed to roll back snapshot after journal truncation failure"
                );
            }
            return Err(e);
        }

        *self.state.write() = new_state;
        info!(
            target: "folio::database",
            collections = snapshot.collections,
            documents = snapshot.documents,
            "State replaced and compacted"
        );
        Ok(())
    }
}

fn into_fields(value: Value) -> Result<Fields> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::invalid_input(format!(
            "document must be a JSON object, got {}",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The document produced by an insert/replace/merge change
fn stored(change: Change) -> Document {
    match change.into_entry() {
        JournalEntry::Insert { doc, .. } | JournalEntry::Mutate { doc, .. } => doc,
        JournalEntry::Delete { .. } => {
            unreachable!("insert, replace and merge never produce delete entries")
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
