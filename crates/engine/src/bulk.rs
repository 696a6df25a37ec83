//! Bulk transactions
//!
//! A batch of insert/replace/merge/delete operations against one collection
//! is applied all-or-nothing:
//!
//! 1. Capture a deep copy of the state
//! 2. Apply each operation in order; the first failure aborts
//! 3. On abort, restore the copy and write nothing to the journal
//! 4. On success, log every entry as one journal batch
//!
//! If logging the batch fails the copy is restored as well, so an error from
//! [`execute`] always means the state is exactly what it was before.

use crate::store::DocumentStore;
use folio_core::{DatabaseState, Document, Error, Fields, Result};
use folio_durability::JournalEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One operation of a bulk batch
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireOp")]
pub enum BulkOp {
    /// Insert a new document
    Insert {
        /// Payload of the new document
        doc: Fields,
    },
    /// Replace an existing document's payload
    Replace {
        /// Target document id
        id: String,
        /// New payload
        doc: Fields,
    },
    /// Deep-merge into an existing document
    Merge {
        /// Target document id
        id: String,
        /// Partial payload
        doc: Fields,
    },
    /// Remove an existing document
    Delete {
        /// Target document id
        id: String,
    },
}

/// `{op, id?, doc?}` as it appears on the wire
#[derive(Deserialize)]
struct WireOp {
    op: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    doc: Option<Value>,
}

impl TryFrom<WireOp> for BulkOp {
    type Error = Error;

    fn try_from(wire: WireOp) -> Result<Self> {
        let op = wire.op.as_str();
        let id = |id: Option<String>| {
            id.ok_or_else(|| Error::invalid_input(format!("bulk op '{}' requires an id", op)))
        };
        let doc = |doc: Option<Value>| match doc {
            Some(Value::Object(fields)) => Ok(fields),
            Some(_) => Err(Error::invalid_input(format!(
                "bulk op '{}' requires doc to be an object",
                op
            ))),
            None => Err(Error::invalid_input(format!("bulk op '{}' requires a doc", op))),
        };

        match op {
            "insert" => Ok(BulkOp::Insert { doc: doc(wire.doc)? }),
            "update" => Ok(BulkOp::Replace {
                id: id(wire.id)?,
                doc: doc(wire.doc)?,
            }),
            "patch" => Ok(BulkOp::Merge {
                id: id(wire.id)?,
                doc: doc(wire.doc)?,
            }),
            "delete" => Ok(BulkOp::Delete { id: id(wire.id)? }),
            other => Err(Error::invalid_input(format!(
                "unknown bulk op '{}'; expected insert, update, patch or delete",
                other
            ))),
        }
    }
}

impl BulkOp {
    /// Parse a wire batch (a JSON array of `{op, id?, doc?}`)
    ///
    /// Any malformed element rejects the whole batch.
    pub fn parse_batch(value: Value) -> Result<Vec<BulkOp>> {
        serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("malformed bulk batch: {}", e)))
    }

    /// Wire name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            BulkOp::Insert { .. } => "insert",
            BulkOp::Replace { .. } => "update",
            BulkOp::Merge { .. } => "patch",
            BulkOp::Delete { .. } => "delete",
        }
    }
}

/// Result of one successful operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum OpResult {
    /// The inserted document
    Insert {
        /// Document as stored
        doc: Document,
    },
    /// The replaced document
    #[serde(rename = "update")]
    Replace {
        /// Document as stored
        doc: Document,
    },
    /// The merged document
    #[serde(rename = "patch")]
    Merge {
        /// Document as stored
        doc: Document,
    },
    /// A removed document id
    Delete {
        /// Removed id
        id: String,
    },
}

impl OpResult {
    /// The resulting document, if the operation produced one
    pub fn document(&self) -> Option<&Document> {
        match self {
            OpResult::Insert { doc } | OpResult::Replace { doc } | OpResult::Merge { doc } => {
                Some(doc)
            }
            OpResult::Delete { .. } => None,
        }
    }
}

/// Apply `ops` to `collection` atomically
///
/// `log` receives the journal entries of the whole batch once every operation
/// has succeeded. An operation failure surfaces as [`Error::Bulk`] carrying
/// its index; a `log` failure surfaces unchanged. Either way `state` is
/// restored before returning.
pub fn execute<F>(
    state: &mut DatabaseState,
    collection: &str,
    ops: Vec<BulkOp>,
    log: F,
) -> Result<Vec<OpResult>>
where
    F: FnOnce(&[JournalEntry]) -> Result<()>,
{
    let before = state.clone();
    let count = ops.len();

    let applied = apply_all(state, collection, ops);
    let (entries, results) = match applied {
        Ok(applied) => applied,
        Err((index, e)) => {
            *state = before;
            debug!(target: "folio::bulk", collection, index, error = %e, "Bulk batch rolled back");
            return Err(Error::bulk(index, e));
        }
    };

    if let Err(e) = log(&entries) {
        *state = before;
        warn!(target: "folio::bulk", collection, error = %e, "Bulk batch not logged; rolled back");
        return Err(e);
    }

    debug!(target: "folio::bulk", collection, ops = count, "Bulk batch committed");
    Ok(results)
}

type Applied = (Vec<JournalEntry>, Vec<OpResult>);

fn apply_all(
    state: &mut DatabaseState,
    collection: &str,
    ops: Vec<BulkOp>,
) -> std::result::Result<Applied, (usize, Error)> {
    let mut store = DocumentStore::new(state);
    let mut entries = Vec::with_capacity(ops.len());
    let mut results = Vec::with_capacity(ops.len());

    for (index, op) in ops.into_iter().enumerate() {
        let change = match &op {
            BulkOp::Insert { doc } => store.insert(collection, doc.clone()),
            BulkOp::Replace { id, doc } => store.replace(collection, id, doc.clone()),
            BulkOp::Merge { id, doc } => store.merge(collection, id, doc),
            BulkOp::Delete { id } => store.remove(collection, id),
        }
        .map_err(|e| (index, e))?;

        let entry = change.into_entry();
        let result = match (op, &entry) {
            (BulkOp::Insert { .. }, JournalEntry::Insert { doc, .. }) => {
                OpResult::Insert { doc: doc.clone() }
            }
            (BulkOp::Replace { .. }, JournalEntry::Mutate { doc, .. }) => {
                OpResult::Replace { doc: doc.clone() }
            }
            (BulkOp::Merge { .. }, JournalEntry::Mutate { doc, .. }) => {
                OpResult::Merge { doc: doc.clone() }
            }
            (_, JournalEntry::Delete { id, .. }) => OpResult::Delete { id: id.clone() },
            (op, _) => unreachable!("store returned a mismatched entry for {}", op.name()),
        };
        entries.push(entry);
        results.push(result);
    }

    Ok((entries, results))
}
