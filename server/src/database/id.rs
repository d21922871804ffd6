//! Entity identifiers shared by both storage drivers.
//!
//! The embedded store keys documents by plain strings while MongoDB uses
//! native `ObjectId`s. `EntityId` carries either form and every comparison
//! goes through the normalized string form, so two ids that print the same
//! are equal regardless of which driver produced them.
//!
//! # Invariants
//!
//! - An `EntityId` is never empty.
//! - `EntityId::Object` always holds a valid 12-byte `ObjectId`.

use std::fmt;
use std::hash::{Hash, Hasher};

use mongodb::bson::oid::ObjectId;
use serde::{Serialize, Serializer};

/// Which backing store is active.
///
/// Selects how wire-level identifiers are converted into [`EntityId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Embedded, file-backed store. Identifiers are plain strings.
    Local,
    /// Networked MongoDB store. Identifiers are `ObjectId`s.
    MongoDb,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// Identifier of a stored document.
#[derive(Debug, Clone)]
pub enum EntityId {
    /// Identifier used by the embedded store.
    Local(String),
    /// Native identifier used by MongoDB.
    Object(ObjectId),
}

impl EntityId {
    /// The normalized string form used for comparisons and serialization.
    #[must_use]
    pub fn to_normalized(&self) -> String {
        match self {
            Self::Local(raw) => raw.clone(),
            Self::Object(oid) => oid.to_hex(),
        }
    }

    /// The native `ObjectId`, when this id came from the networked store.
    #[must_use]
    pub const fn as_object_id(&self) -> Option<&ObjectId> {
        match self {
            Self::Local(_) => None,
            Self::Object(oid) => Some(oid),
        }
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        self.to_normalized() == other.to_normalized()
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_normalized().hash(state);
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(raw) => write!(f, "{raw}"),
            Self::Object(oid) => write!(f, "{}", oid.to_hex()),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_normalized())
    }
}

/// Error returned when a raw identifier is not valid for the active driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidIdError {
    /// The identifier is an empty string.
    Empty,
    /// The identifier is not a 24-character hex `ObjectId`.
    Malformed { raw: String, kind: DriverKind },
}

impl fmt::Display for InvalidIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier must not be empty"),
            Self::Malformed { raw, kind } => {
                write!(f, "'{raw}' is not a valid {kind} identifier")
            }
        }
    }
}

impl std::error::Error for InvalidIdError {}

/// Convert a wire-level identifier into the form used by `kind`.
///
/// # Errors
///
/// Returns `InvalidIdError::Empty` for an empty string, and
/// `InvalidIdError::Malformed` when MongoDB cannot parse it as an `ObjectId`.
pub fn to_entity_id(kind: DriverKind, raw: &str) -> Result<EntityId, InvalidIdError> {
    if raw.is_empty() {
        return Err(InvalidIdError::Empty);
    }

    match kind {
        DriverKind::Local => Ok(EntityId::Local(raw.to_string())),
        DriverKind::MongoDb => ObjectId::parse_str(raw)
            .map(EntityId::Object)
            .map_err(|_| InvalidIdError::Malformed {
                raw: raw.to_string(),
                kind,
            }),
    }
}

/// Compare two possibly-absent identifiers by their normalized form.
///
/// An absent id is unequal to everything, including another absent id.
#[must_use]
pub fn is_equal_ids(a: Option<&EntityId>, b: Option<&EntityId>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_normalized() == b.to_normalized(),
        _ => false,
    }
}

/// Whether `raw` is present and converts into an identifier for `kind`.
#[must_use]
pub fn is_entity_id(kind: DriverKind, raw: Option<&str>) -> bool {
    raw.is_some_and(|raw| to_entity_id(kind, raw).is_ok())
}
