//! Database engine for Folio
//!
//! This crate orchestrates the lower layers:
//! - Database: main struct with open/shutdown and the mutation section
//! - Document store primitives (insert, replace, merge, remove)
//! - Bulk transactions with rollback
//! - Query engine (filter, sort, paginate)
//! - Compaction and the auto-compaction timer
//! - Import/export
//!
//! The engine is the only component that knows how state, journal and
//! snapshot are kept consistent with each other.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bulk;
pub mod compaction;
pub mod database;
pub mod query;
pub mod store;
pub mod transfer;

pub use bulk::{BulkOp, OpResult};
pub use compaction::{AutoCompactor, AutoCompactorStats, CompactionInfo};
pub use database::{Database, DatabaseBuilder, DatabaseStats, FolioConfig};
pub use query::{Filter, QueryOptions, QueryResult, SortDirection, SortSpec, DEFAULT_LIMIT};
pub use store::{Change, DocumentStore};
pub use transfer::{ExportFormat, ImportFormat, ImportPayload};
