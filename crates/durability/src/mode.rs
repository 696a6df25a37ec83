//! Durability mode configuration
//!
//! Controls journal sync behavior (Standard, Always).

/// Durability mode for journal appends
///
/// # Modes
///
/// | Mode | fsync | Survives |
/// |------|-------|----------|
/// | Standard | Never on append | Process crash |
/// | Always | Every append | Process crash and power loss |
///
/// Snapshots and backups are always fsynced before they are renamed into
/// place, independent of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Records are handed to the OS on every append but not fsynced (the default)
    ///
    /// A process crash loses nothing; a power loss may lose the tail of the
    /// journal written since the last compaction.
    #[default]
    Standard,

    /// fsync after every append (slow, maximum durability)
    Always,
}

impl DurabilityMode {
    /// Check if this mode requires an fsync on every append
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Parse the config-file spelling (`"standard"` or `"always"`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(DurabilityMode::Standard),
            "always" => Some(DurabilityMode::Always),
            _ => None,
        }
    }

    /// Config-file spelling of the mode
    pub fn name(&self) -> &'static str {
        match self {
            DurabilityMode::Standard => "standard",
            DurabilityMode::Always => "always",
        }
    }
}
