//! Durability layer for Folio
//!
//! This crate handles everything that touches disk:
//!
//! - Journal: append-only JSON-lines log of accepted mutations, replayed on open
//! - Durability modes: Standard (default), Always
//! - Snapshot: crash-safe full-state file (write-fsync-rename)
//! - Backups: zstd-compressed, timestamp-named snapshot copies
//! - Database directory layout
//! - Fault injection for crash tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup; // Compressed point-in-time copies
pub mod journal; // Append-only mutation log
pub mod mode; // Journal sync policy
pub mod paths; // Directory layout
pub mod snapshot; // Atomic full-state file
pub mod testing; // Fault injection for crash tests

// === Re-exports ===
pub use backup::{read_backup, BackupManager, BACKUP_EXTENSION, BACKUP_PREFIX, DEFAULT_COMPRESSION_LEVEL};
pub use journal::{replay_file, Journal, JournalCounters, JournalEntry, ReplayStats};
pub use mode::DurabilityMode;
pub use paths::{
    DatabasePaths, BACKUPS_DIR_NAME, CONFIG_FILE_NAME, JOURNAL_FILE_NAME, SNAPSHOT_FILE_NAME,
};
pub use snapshot::{SnapshotInfo, SnapshotManager};
pub use testing::JournalFault;
