//! In-memory evaluation of queries, projections and updates.

use serde_json::Value;

use crate::database::DriverError;
use crate::database::query::{Condition, Document, ID_FIELD, Projection, Query, QueryValue, Update};

/// Whether `doc` satisfies every clause of `query`.
#[must_use]
pub fn matches(doc: &Document, query: &Query) -> bool {
    query
        .clauses()
        .iter()
        .all(|(field, condition)| matches_condition(lookup(doc, field), condition))
}

fn matches_condition(stored: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(value) => value_equals(stored, value),
        Condition::Ne(value) => !value_equals(stored, value),
        Condition::In(values) => values.iter().any(|value| value_equals(stored, value)),
        Condition::Exists(present) => stored.is_some() == *present,
    }
}

/// Equality with array containment: `{tags: "a"}` matches `tags: ["a", "b"]`.
fn value_equals(stored: Option<&Value>, target: &QueryValue) -> bool {
    let target = target.to_json();
    match stored {
        Some(Value::Array(items)) if !target.is_array() => items.contains(&target),
        Some(value) => *value == target,
        None => false,
    }
}

/// Resolve a dotted field path such as `meta.author`.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Keep only `_id` and the projected top-level fields.
#[must_use]
pub fn project(doc: &Document, projection: &Projection) -> Document {
    let mut projected = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        projected.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in projection.fields() {
        if let Some(value) = doc.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

/// Produce the updated form of `doc`. The `_id` never changes.
pub fn apply_update(doc: &Document, update: &Update) -> Result<Document, DriverError> {
    let id = doc.get(ID_FIELD);
    let mut updated = match update {
        Update::Replace(replacement) => replacement.clone(),
        Update::Set(fields) => {
            let mut updated = doc.clone();
            for (field, value) in fields {
                updated.insert(field.clone(), value.clone());
            }
            updated
        }
    };

    if let Some(old) = id {
        if updated.get(ID_FIELD).is_some_and(|new| new != old) {
            return Err(DriverError::InvalidOperation(
                "an update cannot change a document's _id".to_string(),
            ));
        }
        updated.insert(ID_FIELD.to_string(), old.clone());
    }

    Ok(updated)
}

/// Starting document for an upsert: the query's top-level equality clauses.
#[must_use]
pub fn upsert_seed(query: &Query) -> Document {
    let mut seed = Document::new();
    for (field, condition) in query.clauses() {
        if let Condition::Eq(value) = condition
            && !field.contains('.')
        {
            seed.insert(field.clone(), value.to_json());
        }
    }
    seed
}
