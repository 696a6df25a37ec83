//! Compressed point-in-time backups
//!
//! A backup is the snapshot wire form compressed with zstd and written to
//! `backups/backup-<UTC timestamp>-<seq>.json.zst`. The timestamp is fixed
//! width (`YYYYMMDDTHHMMSSffffffZ`) so lexicographic order of file names is
//! chronological order; `seq` only moves past `000` when two backups land in
//! the same microsecond.
//!
//! Backups are additive: writing one never touches live state, the journal
//! or the snapshot.

use chrono::{DateTime, Utc};
use folio_core::{DatabaseState, Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name prefix of every backup
pub const BACKUP_PREFIX: &str = "backup-";
/// File name suffix of every backup
pub const BACKUP_EXTENSION: &str = ".json.zst";
/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Writer and reader for backup files
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    compression_level: i32,
}

impl BackupManager {
    /// Create a manager writing into `dir`
    pub fn new(dir: impl Into<PathBuf>, compression_level: i32) -> Self {
        BackupManager {
            dir: dir.into(),
            compression_level,
        }
    }

    /// Backups directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Compress `state` into a new backup file and return its path
    ///
    /// The archive is written to a temporary file and renamed into place, so
    /// either the complete backup exists or nothing is left behind.
    pub fn backup(&self, state: &DatabaseState) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let bytes = state.to_json_bytes()?;
        let compressed = zstd::encode_all(bytes.as_slice(), self.compression_level)
            .map_err(|e| Error::Compression(format!("zstd encode: {}", e)))?;

        let path = self.next_path(Utc::now());
        let temp_path = path.with_extension("tmp");

        let result = (|| -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(
            target: "folio::backup",
            path = %path.display(),
            documents = state.document_count(),
            raw_bytes = bytes.len(),
            compressed_bytes = compressed.len(),
            "Backup written"
        );
        Ok(path)
    }

    /// Decompress and parse a backup file
    pub fn read(&self, file: &Path) -> Result<DatabaseState> {
        read_backup(file)
    }

    /// Existing backups in chronological order
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION) {
                backups.push(entry.path());
            }
        }
        backups.sort();
        Ok(backups)
    }

    /// First unused backup path for `now`
    fn next_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stamp = now.format("%Y%m%dT%H%M%S%6fZ");
        let mut seq = 0u32;
        loop {
            let path = self
                .dir
                .join(format!("{}{}-{:03}{}", BACKUP_PREFIX, stamp, seq, BACKUP_EXTENSION));
            if !path.exists() {
                return path;
            }
            seq += 1;
        }
    }
}

/// Decompress, parse and validate the backup at `file`
///
/// A backup whose contents fail [`DatabaseState::validate`] is rejected
/// with `InvalidInput`.
pub fn read_backup(file: &Path) -> Result<DatabaseState> {
    let compressed = fs::read(file)?;
    let bytes = zstd::decode_all(compressed.as_slice())
        .map_err(|e| Error::Compression(format!("zstd decode '{}': {}", file.display(), e)))?;
    let state = DatabaseState::from_json_slice(&bytes)?;
    state.validate()?;
    Ok(state)
}
