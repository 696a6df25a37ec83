//! Database builder for programmatic configuration
//!
//! Values set on the builder override `folio.toml` for this open only; the
//! file itself is left untouched.

use std::path::PathBuf;
use std::time::Duration;

use folio_core::{Error, Result};
use folio_durability::{DatabasePaths, DurabilityMode};

use super::config::FolioConfig;
use super::Database;

// ============================================================================
// Database Builder Pattern
// ============================================================================

/// Builder for opening a database with overrides
///
/// ```ignore
/// use folio_engine::Database;
/// use std::time::Duration;
///
/// // Defaults from folio.toml
/// let db = Database::open("/data/library")?;
///
/// // fsync every append, compact every 5 seconds
/// let db = Database::builder()
///     .path("/data/library")
///     .always()
///     .compaction_interval(Duration::from_secs(5))
///     .open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    durability: Option<DurabilityMode>,
    compaction_interval: Option<Duration>,
    backup_compression_level: Option<i32>,
}

impl DatabaseBuilder {
    /// Create a builder with no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Set database directory (required)
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Override the durability mode
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = Some(mode);
        self
    }

    /// fsync every journal append
    pub fn always(self) -> Self {
        self.durability(DurabilityMode::Always)
    }

    /// Flush journal appends to the OS without fsync
    pub fn standard(self) -> Self {
        self.durability(DurabilityMode::Standard)
    }

    /// Override the auto-compaction period; `Duration::ZERO` disables it
    ///
    /// Intervals are kept in whole milliseconds; a non-zero interval below
    /// one millisecond rounds up to 1 ms.
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.compaction_interval = Some(interval);
        self
    }

    /// Disable the auto-compaction timer
    pub fn no_auto_compaction(self) -> Self {
        self.compaction_interval(Duration::ZERO)
    }

    /// Override the zstd level used for backups
    pub fn backup_compression_level(mut self, level: i32) -> Self {
        self.backup_compression_level = Some(level);
        self
    }

    /// The durability override, if any
    pub fn get_durability(&self) -> Option<DurabilityMode> {
        self.durability
    }

    /// The configured path, if any
    pub fn get_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Open the database
    ///
    /// Reads `folio.toml` (writing the default first if missing), applies
    /// the overrides and opens the directory.
    pub fn open(self) -> Result<Database> {
        let path = self
            .path
            .ok_or_else(|| Error::invalid_input("DatabaseBuilder::open requires a path"))?;
        let paths = DatabasePaths::from_root(path);
        paths.create_directories()?;

        FolioConfig::write_default_if_missing(&paths.config())?;
        let mut config = FolioConfig::from_file(&paths.config())?;

        if let Some(mode) = self.durability {
            config.durability = mode.name().to_string();
        }
        if let Some(interval) = self.compaction_interval {
            config.compaction_interval_ms = interval_ms(interval);
        }
        if let Some(level) = self.backup_compression_level {
            config.backup_compression_level = level;
        }

        Database::open_with_paths(paths, config)
    }
}

/// Whole milliseconds in `interval`, rounded up so only zero maps to zero
fn interval_ms(interval: Duration) -> u64 {
    u64::try_from(interval.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}
