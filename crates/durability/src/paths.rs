//! Database directory structure
//!
//! A database is a portable directory containing all state:
//!
//! ```text
//! data/
//! ├── folio.toml        # Configuration
//! ├── snapshot.json     # Last compacted state
//! ├── journal.ndjson    # Mutations since the last compaction
//! └── backups/          # Compressed point-in-time copies
//!     ├── backup-20240101T000000000000Z.json.zst
//!     └── ...
//! ```

use std::path::{Path, PathBuf};

/// Config file name placed in the database directory
pub const CONFIG_FILE_NAME: &str = "folio.toml";
/// Snapshot file name
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";
/// Journal file name
pub const JOURNAL_FILE_NAME: &str = "journal.ndjson";
/// Backups directory name
pub const BACKUPS_DIR_NAME: &str = "backups";

/// Database directory paths
#[derive(Debug, Clone)]
pub struct DatabasePaths {
    root: PathBuf,
}

impl DatabasePaths {
    /// Create paths from root directory
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        DatabasePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root database directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the config file path
    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Get the snapshot file path
    pub fn snapshot(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE_NAME)
    }

    /// Get the journal file path
    pub fn journal(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE_NAME)
    }

    /// Get the backups directory
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR_NAME)
    }

    /// Check if a database exists at this path
    ///
    /// A database exists once either its snapshot or its journal is present.
    pub fn exists(&self) -> bool {
        self.snapshot().exists() || self.journal().exists()
    }

    /// Create the full directory structure
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.backups_dir())?;
        Ok(())
    }
}
