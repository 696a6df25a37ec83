//! Error types for Folio
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for Folio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Folio document store
#[derive(Debug, Error)]
pub enum Error {
    /// Mutation or lookup targeted a document that does not exist
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection that was searched
        collection: String,
        /// Requested document id
        id: String,
    },

    /// Malformed caller input (filter, sort, pagination, import payload, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A journal record could not be parsed during replay
    ///
    /// Replay never fails with this error; it is reported through logs and
    /// replay statistics so that one bad line does not abort recovery.
    #[error("Journal corruption at line {line}: {reason}")]
    JournalCorruption {
        /// 1-based line number within the journal file
        line: usize,
        /// Parser error message
        reason: String,
    },

    /// I/O error (journal append, snapshot write, backup read/write)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backup compression or decompression failure
    #[error("Compression error: {0}")]
    Compression(String),

    /// The database no longer accepts mutations
    #[error("Database is shutting down")]
    ShuttingDown,

    /// A bulk transaction aborted at `index`; nothing from the batch was applied
    #[error("Bulk operation {index} failed: {source}")]
    Bulk {
        /// Position of the failing operation within the batch
        index: usize,
        /// The error raised by that operation
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a NotFound error
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Wrap an error raised by the operation at `index` of a bulk batch
    pub fn bulk(index: usize, source: Error) -> Self {
        Error::Bulk {
            index,
            source: Box::new(source),
        }
    }

    /// The underlying error, looking through bulk wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Bulk { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if this is (or wraps) a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    /// True if this is (or wraps) an InvalidInput error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self.root(), Error::InvalidInput(_))
    }

    /// True for failures of the underlying storage (I/O, encoding, compression)
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self.root(),
            Error::Io(_) | Error::Serialization(_) | Error::Compression(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
