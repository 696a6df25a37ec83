//! Identifier types for Folio
//!
//! - DocumentId: 128-bit random identifier assigned at document creation
//! - Collection names: validated at the API boundary

use crate::error::{Error, Result};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a document
///
/// A DocumentId is a wrapper around a UUID v4. Ids are rendered as 32
/// lowercase hex characters without hyphens and are treated as opaque
/// strings everywhere else in the system. Collisions are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random DocumentId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Validate a collection name
///
/// Names must be non-empty and free of control characters; anything else
/// (including `/` and spaces) is accepted verbatim.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_input("collection name must not be empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_input(format!(
            "collection name {:?} contains control characters",
            name
        )));
    }
    Ok(())
}
