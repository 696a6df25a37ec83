//! Import and export
//!
//! Two payload shapes are supported:
//!
//! - Snapshot: the `{"collections": {name: {id: doc}}}` object, exactly what
//!   `snapshot.json` holds. Importing one replaces the whole state.
//! - NDJSON: one `{"collection": name, "doc": {...}}` record per line.
//!   Importing inserts every record as a new document with a fresh id.
//!
//! Parsing is separate from applying so a malformed payload is rejected
//! before anything changes.

use folio_core::{
    strip_reserved, DatabaseState, Document, Error, Fields, Result,
};
use crate::store::DocumentStore;
use folio_durability::JournalEntry;
use serde::Serialize;
use serde_json::Value;

/// Export payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Snapshot-shaped JSON object
    Snapshot,
    /// `{collection, doc}` per line
    Ndjson,
}

/// Import payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Snapshot-shaped JSON object; replaces the state
    Snapshot,
    /// `{collection, doc}` per line; each record inserted as new
    Ndjson,
}

/// A validated import payload
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    /// Replacement state
    Snapshot(DatabaseState),
    /// `(collection, payload)` pairs to insert, in order
    Records(Vec<(String, Fields)>),
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    collection: &'a str,
    doc: &'a Document,
}

/// Serialize `state` in `format`
pub fn export(state: &DatabaseState, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Snapshot => state.to_json_bytes(),
        ExportFormat::Ndjson => {
            let mut out = Vec::new();
            for (collection, documents) in &state.collections {
                for doc in documents.values() {
                    serde_json::to_writer(&mut out, &ExportRecord { collection, doc })?;
                    out.push(b'\n');
                }
            }
            Ok(out)
        }
    }
}

/// Validate and parse an import payload
///
/// Every problem is reported as `InvalidInput`.
pub fn parse_import(bytes: &[u8], format: ImportFormat) -> Result<ImportPayload> {
    match format {
        ImportFormat::Snapshot => parse_snapshot(bytes).map(ImportPayload::Snapshot),
        ImportFormat::Ndjson => parse_records(bytes).map(ImportPayload::Records),
    }
}

fn parse_snapshot(bytes: &[u8]) -> Result<DatabaseState> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::invalid_input(format!("import is not valid JSON: {}", e)))?;
    match value.get("collections") {
        Some(Value::Object(_)) => {}
        _ => {
            return Err(Error::invalid_input(
                "snapshot import must be an object with a \"collections\" object",
            ))
        }
    }
    let state: DatabaseState = serde_json::from_value(value)
        .map_err(|e| Error::invalid_input(format!("malformed snapshot import: {}", e)))?;

    state.validate()?;
    Ok(state)
}

fn parse_records(bytes: &[u8]) -> Result<Vec<(String, Fields)>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid_input(format!("import is not UTF-8: {}", e)))?;

    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let bad = |reason: &str| Error::invalid_input(format!("import line {}: {}", line_no, reason));

        let value: Value = serde_json::from_str(line).map_err(|e| bad(&e.to_string()))?;
        let collection = match value.get("collection") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(bad("missing or empty \"collection\"")),
        };
        let fields = match value.get("doc") {
            Some(Value::Object(doc)) => strip_reserved(doc.clone()),
            _ => return Err(bad("\"doc\" must be an object")),
        };
        records.push((collection, fields));
    }
    Ok(records)
}

/// Insert every record as a new document, all-or-nothing
///
/// Mirrors a bulk transaction: `log` receives every entry once all inserts
/// have succeeded, and any failure (including from `log`) restores `state`.
/// Returns the number of documents inserted.
pub fn apply_records<F>(
    state: &mut DatabaseState,
    records: Vec<(String, Fields)>,
    log: F,
) -> Result<usize>
where
    F: FnOnce(&[JournalEntry]) -> Result<()>,
{
    let before = state.clone();
    let inserted = insert_all(state, records).and_then(|entries| {
        log(&entries)?;
        Ok(entries.len())
    });
    if inserted.is_err() {
        *state = before;
    }
    inserted
}

fn insert_all(state: &mut DatabaseState, records: Vec<(String, Fields)>) -> Result<Vec<JournalEntry>> {
    let mut store = DocumentStore::new(state);
    records
        .into_iter()
        .enumerate()
        .map(|(index, (collection, fields))| {
            store
                .insert(&collection, fields)
                .map(|change| change.into_entry())
                .map_err(|e| Error::bulk(index, e))
        })
        .collect()
}
