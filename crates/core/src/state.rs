//! In-memory database state
//!
//! `DatabaseState` maps collection names to collections, and each collection
//! maps document ids to documents. Both levels are ordered maps, so the
//! serialized form (`{"collections": {name: {id: doc}}}`) is deterministic:
//! serializing equal states always yields identical bytes.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::validate_collection_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named set of documents keyed by id
pub type Collection = BTreeMap<String, Document>;

/// Full database contents; the unit of durability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseState {
    /// Collections by name
    #[serde(default)]
    pub collections: BTreeMap<String, Collection>,
}

impl DatabaseState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a collection
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Look up a document
    pub fn get(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections.get(collection).and_then(|c| c.get(id))
    }

    /// Store `doc` under its id, creating the collection if needed
    ///
    /// Returns the previous document with the same id, if any.
    pub fn put(&mut self, collection: &str, doc: Document) -> Option<Document> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id().to_string(), doc)
    }

    /// Remove a document; the (possibly now empty) collection is kept
    pub fn remove(&mut self, collection: &str, id: &str) -> Option<Document> {
        self.collections.get_mut(collection).and_then(|c| c.remove(id))
    }

    /// Remove a whole collection
    pub fn drop_collection(&mut self, name: &str) -> Option<Collection> {
        self.collections.remove(name)
    }

    /// Collection names in lexicographic order
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    /// Total number of documents across all collections
    pub fn document_count(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    /// True if there are no collections at all
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Serialize to the snapshot wire form
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse the snapshot wire form
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check a state that came from outside the engine
    ///
    /// Collection names must be valid, every document must sit under its own
    /// id, and `updatedAt` may not precede `createdAt`. Violations are
    /// `InvalidInput`.
    pub fn validate(&self) -> Result<()> {
        for (name, documents) in &self.collections {
            validate_collection_name(name)?;
            for (key, doc) in documents {
                if key.as_str() != doc.id() {
                    return Err(Error::invalid_input(format!(
                        "document under key '{}' in '{}' has id '{}'",
                        key,
                        name,
                        doc.id()
                    )));
                }
                if doc.updated_at() < doc.created_at() {
                    return Err(Error::invalid_input(format!(
                        "document '{}' in '{}' was updated before it was created",
                        key, name
                    )));
                }
            }
        }
        Ok(())
    }
}
