//! Append-only mutation journal
//!
//! Every accepted mutation since the last compaction is recorded as one JSON
//! line:
//!
//! ```text
//! {"type":"insert","collection":"books","doc":{"id":"…","createdAt":"…","updatedAt":"…","title":"Dune"}}
//! {"type":"update","collection":"books","id":"…","doc":{…}}
//! {"type":"delete","collection":"books","id":"…"}
//! ```
//!
//! `update` records carry the post-mutation document for both replace and
//! merge, never a diff, so replay simply stores the value again.
//!
//! # Crash Safety
//!
//! Records are only ever appended. A crash in the middle of a write leaves at
//! most one torn line at the tail; on open the writer terminates such a line
//! so the next record starts cleanly, and replay skips it with a warning.
//!
//! A failed append (write, flush or sync) cuts the file back to its length
//! before the append, so a rejected record never replays and never fuses
//! with the next one. If the cut itself fails, the next append starts with
//! a newline so the leftover bytes stay on a line of their own.

use crate::mode::DurabilityMode;
use crate::testing::JournalFault;
use folio_core::{DatabaseState, Document, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// One accepted mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JournalEntry {
    /// A new document
    Insert {
        /// Target collection
        collection: String,
        /// The document as inserted
        doc: Document,
    },
    /// A replace or merge; `doc` is the resulting document
    #[serde(rename = "update")]
    Mutate {
        /// Target collection
        collection: String,
        /// Target document id
        id: String,
        /// The full post-mutation document
        doc: Document,
    },
    /// A removed document
    Delete {
        /// Target collection
        collection: String,
        /// Removed document id
        id: String,
    },
}

impl JournalEntry {
    /// Collection the entry targets
    pub fn collection(&self) -> &str {
        match self {
            JournalEntry::Insert { collection, .. }
            | JournalEntry::Mutate { collection, .. }
            | JournalEntry::Delete { collection, .. } => collection,
        }
    }

    /// Apply the entry to `state`
    ///
    /// Insert and Mutate store the carried document unconditionally; Delete
    /// of a missing document is a no-op.
    pub fn apply(&self, state: &mut DatabaseState) {
        match self {
            JournalEntry::Insert { collection, doc } | JournalEntry::Mutate { collection, doc, .. } => {
                state.put(collection, doc.clone());
            }
            JournalEntry::Delete { collection, id } => {
                state.remove(collection, id);
            }
        }
    }
}

/// Outcome of a journal replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records applied to the state
    pub applied: u64,
    /// Unparseable records skipped
    pub skipped: u64,
}

/// Cumulative journal counters
///
/// These counters accumulate over the lifetime of the Journal and are not
/// reset by truncation.
#[derive(Debug, Clone, Default)]
pub struct JournalCounters {
    /// Total records appended
    pub records_appended: u64,
    /// Total write calls (one per append or batch)
    pub writes: u64,
    /// Total fsync calls
    pub sync_calls: u64,
    /// Total bytes written
    pub bytes_written: u64,
}

/// Append-only journal file
pub struct Journal {
    path: PathBuf,
    file: File,
    durability: DurabilityMode,
    /// Records in the file since the last truncation
    pending: u64,
    counters: JournalCounters,
    /// A failed append left bytes that could not be cut off
    needs_separator: bool,
    fault: Option<JournalFault>,
}

impl Journal {
    /// Open (or create) the journal at `path` for appending
    ///
    /// `pending` starts at zero; callers that replay the journal should
    /// report the replayed count through [`Journal::set_pending`].
    pub fn open(path: impl AsRef<Path>, durability: DurabilityMode) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        terminate_torn_tail(&mut file)?;

        Ok(Journal {
            path,
            file,
            durability,
            pending: 0,
            counters: JournalCounters::default(),
            needs_separator: false,
            fault: None,
        })
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written since the last truncation
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Override the pending record count (after replay)
    pub fn set_pending(&mut self, pending: u64) {
        self.pending = pending;
    }

    /// Cumulative counters
    pub fn counters(&self) -> &JournalCounters {
        &self.counters
    }

    /// Append a single record
    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        self.append_batch(std::slice::from_ref(entry))
    }

    /// Make the next append fail as described by `fault`
    pub fn arm_fault(&mut self, fault: JournalFault) {
        self.fault = Some(fault);
    }

    /// Append several records as one contiguous write
    ///
    /// On error nothing of the batch remains in the file.
    pub fn append_batch(&mut self, entries: &[JournalEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(entries.len() * 256 + 1);
        if self.needs_separator {
            buf.push(b'\n');
        }
        for entry in entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let start = self.file.metadata()?.len();
        if let Err(e) = self.write_record(&buf) {
            self.cut_back(start);
            return Err(e.into());
        }
        self.needs_separator = false;

        self.pending += entries.len() as u64;
        self.counters.records_appended += entries.len() as u64;
        self.counters.writes += 1;
        self.counters.bytes_written += buf.len() as u64;

        debug!(target: "folio::journal", records = entries.len(), bytes = buf.len(), "Appended");
        Ok(())
    }

    fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        let fault = self.fault.take();
        if let Some(fault @ JournalFault::TornWrite { after_bytes }) = fault {
            self.file.write_all(&buf[..after_bytes.min(buf.len())])?;
            self.file.flush()?;
            return Err(fault.error());
        }

        self.file.write_all(buf)?;
        self.file.flush()?;
        if let Some(fault @ JournalFault::SyncFailure) = fault {
            return Err(fault.error());
        }
        if self.durability.requires_immediate_fsync() {
            self.file.sync_data()?;
            self.counters.sync_calls += 1;
        }
        Ok(())
    }

    /// Drop whatever a failed append left past `len`
    fn cut_back(&mut self, len: u64) {
        match self.file.set_len(len) {
            Ok(()) => {
                warn!(target: "folio::journal", len, "Journal append failed; partial record removed");
            }
            Err(e) => {
                self.needs_separator = true;
                error!(
                    target: "folio::journal",
                    len,
                    error = %e,
                    "Journal append failed and the partial record could not be removed"
                );
            }
        }
    }

    /// Replay every record on top of `snapshot`
    pub fn replay(&self, snapshot: DatabaseState) -> Result<(DatabaseState, ReplayStats)> {
        replay_file(&self.path, snapshot)
    }

    /// Force buffered records to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.counters.sync_calls += 1;
        Ok(())
    }

    /// Empty the journal
    ///
    /// Only valid once every record has been folded into a snapshot.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.pending = 0;
        Ok(())
    }
}

/// Replay the journal at `path` on top of `state`
///
/// A missing file replays as empty. Unparseable lines are logged and skipped;
/// they never abort recovery. Replay is deterministic: the same inputs always
/// produce the same state.
pub fn replay_file(path: &Path, mut state: DatabaseState) -> Result<(DatabaseState, ReplayStats)> {
    let mut stats = ReplayStats::default();

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((state, stats)),
        Err(e) => return Err(e.into()),
    };

    for (index, line) in data.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<JournalEntry>(line) {
            Ok(entry) => {
                entry.apply(&mut state);
                stats.applied += 1;
            }
            Err(e) => {
                let err = Error::JournalCorruption {
                    line: index + 1,
                    reason: e.to_string(),
                };
                warn!(
                    target: "folio::journal",
                    path = %path.display(),
                    error = %err,
                    "Skipping unreadable journal record"
                );
                stats.skipped += 1;
            }
        }
    }

    Ok((state, stats))
}

/// Append a newline if the file does not end with one
fn terminate_torn_tail(file: &mut File) -> io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        warn!(target: "folio::journal", "Journal ends with a torn record; terminating it");
        file.write_all(b"\n")?;
        file.flush()?;
    }
    Ok(())
}
