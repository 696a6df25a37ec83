//! Document store primitives
//!
//! `DocumentStore` applies insert/replace/merge/remove to a borrowed
//! `DatabaseState`. Every mutation returns a [`Change`] carrying the journal
//! entry that describes it and the value it displaced, so the caller can
//! either log the change or undo it.
//!
//! The store knows nothing about locking or persistence; `Database` wraps it
//! with the mutation section and the journal.

use chrono::Utc;
use folio_core::{validate_collection_name, DatabaseState, Document, Error, Fields, Result};
use folio_durability::JournalEntry;

/// An applied, not yet logged, mutation
#[derive(Debug, Clone)]
pub struct Change {
    entry: JournalEntry,
    previous: Option<Document>,
    created_collection: bool,
}

impl Change {
    /// Journal entry describing the mutation
    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    /// The resulting document (None for removals)
    pub fn document(&self) -> Option<&Document> {
        match &self.entry {
            JournalEntry::Insert { doc, .. } | JournalEntry::Mutate { doc, .. } => Some(doc),
            JournalEntry::Delete { .. } => None,
        }
    }

    /// The document this change displaced (None for inserts)
    pub fn previous(&self) -> Option<&Document> {
        self.previous.as_ref()
    }

    /// Consume the change, returning its journal entry
    pub fn into_entry(self) -> JournalEntry {
        self.entry
    }

    /// Revert this change in `state`
    ///
    /// Changes must be undone in reverse order of application.
    pub fn undo(&self, state: &mut DatabaseState) {
        let collection = self.entry.collection();
        match &self.entry {
            JournalEntry::Insert { doc, .. } => {
                state.remove(collection, doc.id());
            }
            JournalEntry::Mutate { .. } | JournalEntry::Delete { .. } => {
                if let Some(previous) = &self.previous {
                    state.put(collection, previous.clone());
                }
            }
        }
        if self.created_collection {
            state.drop_collection(collection);
        }
    }
}

/// Mutation primitives over a borrowed state
pub struct DocumentStore<'a> {
    state: &'a mut DatabaseState,
}

impl<'a> DocumentStore<'a> {
    /// Wrap `state`
    pub fn new(state: &'a mut DatabaseState) -> Self {
        DocumentStore { state }
    }

    /// Insert a new document with a fresh id
    ///
    /// Creates the collection on first use. Reserved keys in `fields` are
    /// ignored.
    pub fn insert(&mut self, collection: &str, fields: Fields) -> Result<Change> {
        validate_collection_name(collection)?;
        let created_collection = self.state.collection(collection).is_none();
        let doc = Document::create(fields, Utc::now());
        self.state.put(collection, doc.clone());
        Ok(Change {
            entry: JournalEntry::Insert {
                collection: collection.to_string(),
                doc,
            },
            previous: None,
            created_collection,
        })
    }

    /// Replace the payload of an existing document wholesale
    pub fn replace(&mut self, collection: &str, id: &str, fields: Fields) -> Result<Change> {
        let existing = self.existing(collection, id)?;
        let doc = existing.replaced(fields, Utc::now());
        self.mutate(collection, doc)
    }

    /// Deep-merge `partial` into an existing document
    pub fn merge(&mut self, collection: &str, id: &str, partial: &Fields) -> Result<Change> {
        let existing = self.existing(collection, id)?;
        let doc = existing.merged(partial, Utc::now());
        self.mutate(collection, doc)
    }

    /// Remove an existing document
    pub fn remove(&mut self, collection: &str, id: &str) -> Result<Change> {
        let previous = self
            .state
            .remove(collection, id)
            .ok_or_else(|| Error::not_found(collection, id))?;
        Ok(Change {
            entry: JournalEntry::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            previous: Some(previous),
            created_collection: false,
        })
    }

    fn existing(&self, collection: &str, id: &str) -> Result<&Document> {
        get(&*self.state, collection, id)
    }

    fn mutate(&mut self, collection: &str, doc: Document) -> Result<Change> {
        let previous = self.state.put(collection, doc.clone());
        Ok(Change {
            entry: JournalEntry::Mutate {
                collection: collection.to_string(),
                id: doc.id().to_string(),
                doc,
            },
            previous,
            created_collection: false,
        })
    }
}

/// Look up a document
pub fn get<'s>(state: &'s DatabaseState, collection: &str, id: &str) -> Result<&'s Document> {
    state
        .get(collection, id)
        .ok_or_else(|| Error::not_found(collection, id))
}

/// Collection names, lexicographically sorted
pub fn list_collections(state: &DatabaseState) -> Vec<String> {
    state.collection_names()
}
