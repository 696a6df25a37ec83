//! Database configuration via `folio.toml`
//!
//! On first open a default `folio.toml` is written into the data directory.
//! To change settings, edit the file and reopen the database, or override
//! individual values programmatically through `DatabaseBuilder`.

use folio_core::{Error, Result};
use folio_durability::{DurabilityMode, DEFAULT_COMPRESSION_LEVEL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default auto-compaction interval (one minute)
pub const DEFAULT_COMPACTION_INTERVAL_MS: u64 = 60_000;

/// Database configuration loaded from `folio.toml`.
///
/// # Example
///
/// ```toml
/// durability = "standard"
/// compaction_interval_ms = 60000
/// backup_compression_level = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Durability mode: `"standard"` or `"always"`.
    #[serde(default = "default_durability_str")]
    pub durability: String,
    /// Auto-compaction period in milliseconds; 0 disables the timer.
    #[serde(default = "default_compaction_interval_ms")]
    pub compaction_interval_ms: u64,
    /// zstd level used for backups (1..=22).
    #[serde(default = "default_backup_compression_level")]
    pub backup_compression_level: i32,
}

fn default_durability_str() -> String {
    "standard".to_string()
}

fn default_compaction_interval_ms() -> u64 {
    DEFAULT_COMPACTION_INTERVAL_MS
}

fn default_backup_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            durability: default_durability_str(),
            compaction_interval_ms: default_compaction_interval_ms(),
            backup_compression_level: default_backup_compression_level(),
        }
    }
}

impl FolioConfig {
    /// Parse the durability string into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"standard"` or `"always"`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        DurabilityMode::from_name(&self.durability).ok_or_else(|| {
            Error::invalid_input(format!(
                "Invalid durability mode '{}' in folio.toml. Expected \"standard\" or \"always\".",
                self.durability
            ))
        })
    }

    /// Auto-compaction interval, or `None` when disabled
    pub fn compaction_interval(&self) -> Option<Duration> {
        match self.compaction_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Check every value, not just that the file parsed.
    pub fn validate(&self) -> Result<()> {
        self.durability_mode()?;
        if !(1..=22).contains(&self.backup_compression_level) {
            return Err(Error::invalid_input(format!(
                "Invalid backup_compression_level {} in folio.toml. Expected 1..=22.",
                self.backup_compression_level
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Folio database configuration
#
# Durability mode: "standard" (default) or "always"
#   "standard" = journal appends reach the OS on every write, no fsync
#   "always"   = fsync every journal append, survives power loss
durability = "standard"

# Auto-compaction period in milliseconds (default: 60000).
# Compaction folds the journal into snapshot.json. 0 disables the timer;
# compaction still runs on shutdown and after restore/import.
compaction_interval_ms = 60000

# zstd compression level for backups, 1 (fast) to 22 (small). Default: 3.
backup_compression_level = 3
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FolioConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
