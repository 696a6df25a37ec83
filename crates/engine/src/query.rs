//! Query engine
//!
//! A query runs over one collection in four steps: filter, count, sort,
//! paginate. Filtering and sorting look at the full wire form of each
//! document, so reserved fields (`id`, `createdAt`, `updatedAt`) can be
//! matched and sorted on like any other top-level key.
//!
//! # Filters
//!
//! - absent: every document matches
//! - a JSON object: exact equality on every key it names
//! - anything else: case-insensitive substring of the document's JSON text
//!
//! # Sorting
//!
//! `field[:asc|desc]`. Numbers compare numerically, strings
//! lexicographically; mixed kinds order bool < number < string, arrays and
//! objects compare equal. Documents without the field (or with `null`) go
//! last in both directions. The sort is stable, so ties keep id order.

use folio_core::{DatabaseState, Document, Error, Fields, Result};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Page size used when no limit is given
pub const DEFAULT_LIMIT: usize = 100;

/// Which documents a query selects
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Every document
    #[default]
    All,
    /// Exact equality on each named top-level field
    Fields(Fields),
    /// Case-insensitive substring of the serialized document
    Text(String),
}

impl Filter {
    /// Interpret a raw `q` parameter
    ///
    /// Input that parses as a JSON object becomes a field filter; anything
    /// else (including other JSON values) is a text search. An empty string
    /// matches everything.
    pub fn parse(raw: &str) -> Filter {
        if raw.is_empty() {
            return Filter::All;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Filter::Fields(fields),
            _ => Filter::Text(raw.to_lowercase()),
        }
    }

    /// Text filter; matching is case-insensitive
    pub fn text(needle: impl AsRef<str>) -> Filter {
        Filter::Text(needle.as_ref().to_lowercase())
    }

    /// True if the wire form `doc` is selected
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Fields(expected) => expected
                .iter()
                .all(|(key, value)| doc.get(key) == Some(value)),
            Filter::Text(needle) => doc.to_string().to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

/// Field and direction to order results by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Top-level field name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `field`, `field:asc` or `field:desc`
    pub fn parse(raw: &str) -> Result<Self> {
        let (field, direction) = match raw.rsplit_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((_, other)) => {
                return Err(Error::invalid_input(format!(
                    "unknown sort direction '{}'; expected asc or desc",
                    other
                )))
            }
            None => (raw, SortDirection::Asc),
        };
        if field.is_empty() {
            return Err(Error::invalid_input("sort field must not be empty"));
        }
        Ok(SortSpec {
            field: field.to_string(),
            direction,
        })
    }
}

/// Parameters of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Document selection
    pub filter: Filter,
    /// Result order; id order when absent
    pub sort: Option<SortSpec>,
    /// Matches to skip (default 0)
    pub offset: Option<usize>,
    /// Maximum items returned (default [`DEFAULT_LIMIT`])
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// Match everything, default pagination
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the sort
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build options from wire parameters (`q`, `limit`, `offset`, `sort`)
    ///
    /// Unknown parameter names are ignored.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = QueryOptions::new();
        for (name, value) in params {
            match name {
                "q" => options.filter = Filter::parse(value),
                "limit" => options.limit = Some(parse_count("limit", value)?),
                "offset" => options.offset = Some(parse_count("offset", value)?),
                "sort" => options.sort = Some(SortSpec::parse(value)?),
                _ => {}
            }
        }
        Ok(options)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|_| {
        Error::invalid_input(format!(
            "{} must be a non-negative integer, got '{}'",
            name, raw
        ))
    })
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Number of matches before pagination
    pub total: usize,
    /// The requested page
    pub items: Vec<Document>,
}

/// Run `options` against `collection`
///
/// A missing collection yields an empty result.
pub fn execute(state: &DatabaseState, collection: &str, options: &QueryOptions) -> QueryResult {
    let Some(documents) = state.collection(collection) else {
        return QueryResult {
            total: 0,
            items: Vec::new(),
        };
    };

    let mut matched: Vec<(&Document, Value)> = documents
        .values()
        .map(|doc| (doc, doc.to_value()))
        .filter(|(_, wire)| options.filter.matches(wire))
        .collect();
    let total = matched.len();

    if let Some(sort) = &options.sort {
        matched.sort_by(|(_, a), (_, b)| {
            compare_field(a.get(&sort.field), b.get(&sort.field), sort.direction)
        });
    }

    let items = matched
        .into_iter()
        .skip(options.offset.unwrap_or(0))
        .take(options.limit.unwrap_or(DEFAULT_LIMIT))
        .map(|(doc, _)| doc.clone())
        .collect();

    QueryResult { total, items }
}

/// Number of documents in `collection` matching `filter`
pub fn count(state: &DatabaseState, collection: &str, filter: &Filter) -> usize {
    state.collection(collection).map_or(0, |documents| {
        documents
            .values()
            .filter(|doc| filter.matches(&doc.to_value()))
            .count()
    })
}

fn compare_field(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    fn present(value: Option<&Value>) -> Option<&Value> {
        value.filter(|v| !v.is_null())
    }

    match (present(a), present(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => compare_values(a, b),
            SortDirection::Desc => compare_values(b, a),
        },
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a.cmp(&b)
            } else {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}
