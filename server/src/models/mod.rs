//! Entity repositories.
//!
//! Each repository binds one driver and one collection name and exposes the
//! domain operations for that entity. Repositories validate required fields
//! before writing and check that an entity exists before updating it, so a
//! missing entity is reported as `NotFound` rather than as a driver failure.
//!
//! # Invariants
//!
//! - A failed validation never writes anything.
//! - Identifiers are converted for the active driver before any query runs.

pub mod alias;
pub mod file;
pub mod page;
pub mod page_order;
pub mod user;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use alias::{Alias, AliasData, AliasKind, AliasRepository};
pub use file::{File, FileData, FileRepository};
pub use page::{Page, PageData, PageRepository};
pub use page_order::{PageOrder, PageOrderData, PageOrderRepository};
pub use user::{User, UserData, UserRepository, verify_password};

use crate::database::{
    Collection, Document, DriverError, InvalidIdError, Query, RemoveOptions, Update,
    UpdateOptions,
};

/// Parent id of top-level pages.
pub const ROOT_PARENT_ID: &str = "0";

/// Error returned by repository operations.
#[derive(Debug)]
pub enum ModelError {
    /// Required fields were absent or blank.
    Validation {
        entity: &'static str,
        missing: Vec<&'static str>,
    },
    /// No entity with this identifier exists.
    NotFound { entity: &'static str, id: String },
    /// The identifier is not valid for the active driver.
    InvalidId(InvalidIdError),
    /// The write would break a uniqueness rule.
    Conflict {
        entity: &'static str,
        message: String,
    },
    /// The backing store failed.
    Storage(DriverError),
    /// A password could not be hashed or checked.
    Hashing(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { entity, missing } => write!(
                f,
                "{entity} is missing required fields: {}",
                missing.join(", ")
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} '{id}' not found"),
            Self::InvalidId(e) => write!(f, "{e}"),
            Self::Conflict { entity, message } => write!(f, "{entity} conflict: {message}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Hashing(message) => write!(f, "password hashing failed: {message}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidId(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DriverError> for ModelError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::InvalidId(e) => Self::InvalidId(e),
            other => Self::Storage(other),
        }
    }
}

impl From<InvalidIdError> for ModelError {
    fn from(e: InvalidIdError) -> Self {
        Self::InvalidId(e)
    }
}

/// Whether an optional text field holds something other than whitespace.
pub(crate) fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

/// Fail with `Validation` listing every field whose flag is `false`.
pub(crate) fn require_fields(
    entity: &'static str,
    fields: &[(&'static str, bool)],
) -> Result<(), ModelError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModelError::Validation { entity, missing })
    }
}

/// Fail with `Validation` listing every field that is set but blank.
///
/// Used on update, where absent fields are left unchanged.
pub(crate) fn reject_blank(
    entity: &'static str,
    fields: &[(&'static str, Option<&str>)],
) -> Result<(), ModelError> {
    let checked: Vec<(&'static str, bool)> = fields
        .iter()
        .map(|(name, value)| (*name, value.is_none() || is_present(*value)))
        .collect();
    require_fields(entity, &checked)
}

/// Load one entity by its wire-level identifier.
pub(crate) async fn find_by_id<T>(collection: &Collection<T>, id: &str) -> Result<Option<T>, ModelError>
where
    T: Serialize + DeserializeOwned,
{
    let id = collection.entity_id(id)?;
    Ok(collection.find_one(&Query::by_id(id), None).await?)
}

/// Apply `changes` to an existing entity and return it as updated.
///
/// The entity is loaded first; a missing one fails with `NotFound` and
/// nothing is written.
pub(crate) async fn update_by_id<T, C>(
    collection: &Collection<T>,
    entity: &'static str,
    id: &str,
    changes: &C,
) -> Result<T, ModelError>
where
    T: Serialize + DeserializeOwned,
    C: Serialize,
{
    let query = Query::by_id(collection.entity_id(id)?);
    let not_found = || ModelError::NotFound {
        entity,
        id: id.to_string(),
    };

    if collection.find_one(&query, None).await?.is_none() {
        return Err(not_found());
    }

    let set: Document = crate::database::to_document(changes)?;
    collection
        .update(&query, &Update::Set(set), UpdateOptions::returning())
        .await?
        .into_documents()
        .into_iter()
        .next()
        .ok_or_else(not_found)
}

/// Remove one entity by its wire-level identifier. Returns whether it existed.
pub(crate) async fn remove_by_id<T>(collection: &Collection<T>, id: &str) -> Result<bool, ModelError>
where
    T: Serialize + DeserializeOwned,
{
    let id = collection.entity_id(id)?;
    let removed = collection
        .remove(&Query::by_id(id), RemoveOptions::default())
        .await?;
    Ok(removed > 0)
}
