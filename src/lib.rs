//! Folio - embedded JSON document store
//!
//! Folio keeps named collections of JSON documents in memory and makes them
//! durable with an append-only journal and periodic snapshots. On top of
//! that it offers atomic bulk transactions, a small query engine
//! (filter, sort, paginate) and compressed backups.
//!
//! # Quick Start
//!
//! ```ignore
//! use folio::{Database, Filter, QueryOptions, SortSpec};
//! use serde_json::json;
//!
//! let db = Database::open("/path/to/data")?;
//! let dune = db.insert("books", json!({"title": "Dune", "year": 1965}))?;
//! db.merge("books", dune.id(), json!({"tags": ["sf"]}))?;
//!
//! let page = db.query(
//!     "books",
//!     &QueryOptions::new().filter(Filter::parse("dune")).sort(SortSpec::desc("year")),
//! );
//! assert_eq!(page.total, 1);
//! ```
//!
//! # Architecture
//!
//! - `folio-core`: documents, database state, deep merge, errors
//! - `folio-durability`: journal, snapshot, backups, directory layout
//! - `folio-engine`: the [`Database`] and everything that coordinates them

pub use folio_core::{
    deep_merge, Collection, DatabaseState, Document, DocumentId, Error, Fields, Result,
};
pub use folio_durability::{DurabilityMode, JournalEntry, ReplayStats};
pub use folio_engine::{
    BulkOp, CompactionInfo, Database, DatabaseBuilder, DatabaseStats, ExportFormat, Filter,
    FolioConfig, ImportFormat, OpResult, QueryOptions, QueryResult, SortDirection, SortSpec,
    DEFAULT_LIMIT,
};
