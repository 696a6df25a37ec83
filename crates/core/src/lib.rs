//! Core types for Folio
//!
//! This crate defines the foundational types used throughout the system:
//! - Document: tagged record (id, createdAt, updatedAt + open payload)
//! - DatabaseState: collections of documents, the unit of durability
//! - Deep merge: key-wise recursive combination of JSON objects
//! - DocumentId: random 128-bit identifiers
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod merge;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use document::{
    strip_reserved, Document, Fields, CREATED_AT_FIELD, ID_FIELD, RESERVED_FIELDS,
    UPDATED_AT_FIELD,
};
pub use error::{Error, Result};
pub use merge::deep_merge;
pub use state::{Collection, DatabaseState};
pub use types::{validate_collection_name, DocumentId};
