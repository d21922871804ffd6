//! Query, projection and update descriptions understood by every driver.
//!
//! Drivers never see raw store-specific filter syntax. Repositories build a
//! [`Query`] from typed clauses and each driver translates it: the embedded
//! store evaluates it in memory, MongoDB turns it into a BSON filter.

use serde_json::Value;

use super::id::EntityId;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Field holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// A value compared against a document field.
#[derive(Debug, Clone)]
pub enum QueryValue {
    /// An entity identifier. Becomes a native id on the `_id` field of
    /// stores that have one.
    Id(EntityId),
    /// Any other JSON value.
    Json(Value),
}

impl QueryValue {
    /// The JSON form of this value, with ids in their normalized string form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Id(id) => Value::String(id.to_normalized()),
            Self::Json(value) => value.clone(),
        }
    }
}

impl From<EntityId> for QueryValue {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

impl From<Value> for QueryValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

/// A condition on a single field.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Field equals the value. An array field matches when it contains it.
    Eq(QueryValue),
    /// Negation of `Eq`.
    Ne(QueryValue),
    /// Field equals any of the values.
    In(Vec<QueryValue>),
    /// Field is present (`true`) or absent (`false`).
    Exists(bool),
}

/// A conjunction of field conditions. An empty query matches everything.
#[derive(Debug, Clone, Default)]
pub struct Query {
    clauses: Vec<(String, Condition)>,
}

impl Query {
    /// A query matching every document.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// A query matching the document with the given identifier.
    #[must_use]
    pub fn by_id(id: EntityId) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    /// Require `field` to differ from `value`.
    #[must_use]
    pub fn ne(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    /// Require `field` to equal one of `values`.
    #[must_use]
    pub fn is_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<QueryValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(field, Condition::In(values))
    }

    /// Require `field` to be present or absent.
    #[must_use]
    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.with(field, Condition::Exists(present))
    }

    fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((field.into(), condition));
        self
    }

    /// The clauses of this query, in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    /// Whether this query matches every document.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Restricts which top-level fields are returned. `_id` is always kept.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Keep only the given fields (plus `_id`).
    #[must_use]
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The included field names.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// How matched documents are changed.
#[derive(Debug, Clone)]
pub enum Update {
    /// Replace the whole document, keeping its `_id`.
    Replace(Document),
    /// Overwrite the given top-level fields, leaving the rest untouched.
    Set(Document),
}

/// Options for [`Driver::update`](super::Driver::update).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Update every match instead of at most one.
    pub multi: bool,
    /// Insert a document when nothing matches.
    pub upsert: bool,
    /// Return the updated documents instead of a count.
    pub return_updated_docs: bool,
}

impl UpdateOptions {
    /// Single-document update that returns the updated document.
    #[must_use]
    pub const fn returning() -> Self {
        Self {
            multi: false,
            upsert: false,
            return_updated_docs: true,
        }
    }
}

/// Options for [`Driver::remove`](super::Driver::remove).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove every match instead of at most one.
    pub multi: bool,
}

/// Result of an update.
///
/// The shape is picked by `UpdateOptions::return_updated_docs`, never by
/// inspecting the value.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    /// Number of documents updated, and whether the single one was upserted.
    Affected { count: u64, upserted: bool },
    /// The documents as they are after the update.
    Documents(Vec<T>),
}

impl<T> UpdateOutcome<T> {
    /// Number of documents the update touched.
    #[must_use]
    pub fn count(&self) -> u64 {
        match self {
            Self::Affected { count, .. } => *count,
            Self::Documents(docs) => docs.len() as u64,
        }
    }

    /// The returned documents, or nothing when only a count was requested.
    #[must_use]
    pub fn into_documents(self) -> Vec<T> {
        match self {
            Self::Affected { .. } => Vec::new(),
            Self::Documents(docs) => docs,
        }
    }

    /// Convert the returned documents, leaving counts untouched.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<UpdateOutcome<U>, E> {
        match self {
            Self::Affected { count, upserted } => Ok(UpdateOutcome::Affected { count, upserted }),
            Self::Documents(docs) => Ok(UpdateOutcome::Documents(
                docs.into_iter().map(f).collect::<Result<_, _>>()?,
            )),
        }
    }
}
