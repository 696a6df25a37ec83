//! Crash-safe snapshot manager
//!
//! Uses write-fsync-rename pattern for atomic snapshot replacement.
//!
//! # Crash Safety
//!
//! 1. Write to temporary file (snapshot.json.tmp)
//! 2. fsync the temporary file
//! 3. Atomic rename over the final path
//! 4. fsync the parent directory
//!
//! A reader therefore sees either the previous snapshot or the new one,
//! never a partially written file.

use folio_core::{DatabaseState, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Information about a written snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Path to the snapshot file
    pub path: PathBuf,
    /// Number of collections written
    pub collections: usize,
    /// Number of documents written
    pub documents: usize,
    /// Size of the snapshot file in bytes
    pub size_bytes: u64,
}

/// Owner of the snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    /// Create a manager for the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotManager { path: path.into() }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Serialize `state` and atomically replace the snapshot file
    pub fn write(&self, state: &DatabaseState) -> Result<SnapshotInfo> {
        let bytes = state.to_json_bytes()?;
        let temp_path = self.temp_path();

        let result = (|| -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            drop(file);

            fs::rename(&temp_path, &self.path)?;
            sync_parent_dir(&self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(SnapshotInfo {
            path: self.path.clone(),
            collections: state.collections.len(),
            documents: state.document_count(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Load the snapshot, or `fallback` if there is no usable one
    ///
    /// A malformed snapshot is treated as absent: it is logged, moved aside to
    /// `<snapshot>.corrupt` for inspection, and `fallback` is returned.
    /// Other I/O failures are surfaced.
    pub fn read(&self, fallback: DatabaseState) -> Result<DatabaseState> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(fallback),
            Err(e) => return Err(e.into()),
        };

        match DatabaseState::from_json_slice(&data) {
            Ok(state) => {
                info!(
                    target: "folio::snapshot",
                    collections = state.collections.len(),
                    documents = state.document_count(),
                    "Loaded snapshot"
                );
                Ok(state)
            }
            Err(e) => {
                let mut aside = self.path.as_os_str().to_owned();
                aside.push(".corrupt");
                let aside = PathBuf::from(aside);
                warn!(
                    target: "folio::snapshot",
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Snapshot is malformed; starting from fallback state"
                );
                fs::rename(&self.path, &aside)?;
                Ok(fallback)
            }
        }
    }

    /// Remove a temporary file left behind by a crash mid-write
    ///
    /// Returns true if a file was removed.
    pub fn cleanup_temp_file(&self) -> io::Result<bool> {
        match fs::remove_file(self.temp_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
