//! Fault injection for crash testing
//!
//! A [`JournalFault`] armed on a [`Journal`](crate::Journal) fires on the
//! next append and is then disarmed. It lets tests drive the append failure
//! paths (a torn write, a failed fsync) without a real full disk.
//!
//! ```ignore
//! use folio_durability::testing::JournalFault;
//!
//! journal.arm_fault(JournalFault::TornWrite { after_bytes: 20 });
//! assert!(journal.append(&entry).is_err());
//! ```

use std::io;

/// One-shot failure for the next journal append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalFault {
    /// Write only the first `after_bytes` bytes of the record, then fail
    TornWrite {
        /// Bytes that reach the file before the failure
        after_bytes: usize,
    },
    /// Write the whole record, then fail the sync
    SyncFailure,
}

impl JournalFault {
    pub(crate) fn error(&self) -> io::Error {
        let what = match self {
            JournalFault::TornWrite { .. } => "injected torn journal write",
            JournalFault::SyncFailure => "injected journal sync failure",
        };
        io::Error::new(io::ErrorKind::Other, what)
    }
}
