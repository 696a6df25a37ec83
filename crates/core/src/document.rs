//! Document model
//!
//! A document is a tagged record: three fixed metadata fields (`id`,
//! `createdAt`, `updatedAt`) plus an open key/value payload. On the wire the
//! payload is flattened next to the metadata, so a stored document reads as a
//! single JSON object:
//!
//! ```json
//! {"id": "4f0c…", "createdAt": "2024-01-01T00:00:00.000000000Z", "updatedAt": "…", "title": "Dune"}
//! ```
//!
//! The payload never contains a reserved key. Caller-supplied `id`,
//! `createdAt` and `updatedAt` are dropped when a document is built.

use crate::merge::deep_merge;
use crate::types::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved field holding the document id
pub const ID_FIELD: &str = "id";
/// Reserved field holding the creation timestamp
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Reserved field holding the last-mutation timestamp
pub const UPDATED_AT_FIELD: &str = "updatedAt";
/// All reserved field names
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// User payload of a document
pub type Fields = Map<String, Value>;

/// A stored record: metadata plus an open payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(rename = "createdAt", with = "rfc3339_nanos")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "rfc3339_nanos")]
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Fields,
}

impl Document {
    /// Build a new document with a fresh id and `createdAt = updatedAt = now`
    pub fn create(fields: Fields, now: DateTime<Utc>) -> Self {
        Document {
            id: DocumentId::new().to_string(),
            created_at: now,
            updated_at: now,
            fields: strip_reserved(fields),
        }
    }

    /// Rebuild a document from its parts
    ///
    /// Reserved keys in `fields` are dropped and `updated_at` is clamped so
    /// that it never precedes `created_at`.
    pub fn from_parts(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        fields: Fields,
    ) -> Self {
        Document {
            id: id.into(),
            created_at,
            updated_at: updated_at.max(created_at),
            fields: strip_reserved(fields),
        }
    }

    /// Document id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last-mutation timestamp
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// User payload (never contains reserved keys)
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Payload value for `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A copy whose payload is exactly `fields`, keeping id and `createdAt`
    pub fn replaced(&self, fields: Fields, now: DateTime<Utc>) -> Self {
        Document {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: now.max(self.created_at),
            fields: strip_reserved(fields),
        }
    }

    /// A copy with `partial` deep-merged into the payload
    pub fn merged(&self, partial: &Fields, now: DateTime<Utc>) -> Self {
        let mut fields = self.fields.clone();
        deep_merge(&mut fields, &strip_reserved(partial.clone()));
        Document {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: now.max(self.created_at),
            fields,
        }
    }

    /// The full wire form (metadata and payload) as a JSON object
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + RESERVED_FIELDS.len());
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        object.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(rfc3339_nanos::format(&self.created_at)),
        );
        object.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(rfc3339_nanos::format(&self.updated_at)),
        );
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

/// Timestamps are always written with nine fractional digits so that their
/// string form sorts chronologically and parses back without loss.
mod rfc3339_nanos {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Remove reserved keys from a caller-supplied payload
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
    fields
}
