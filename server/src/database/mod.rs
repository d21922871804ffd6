//! Pluggable document storage.
//!
//! Repositories talk to a [`Driver`], never to a concrete store. Two drivers
//! exist:
//!
//! - [`LocalDriver`]: embedded, file-backed, one append-only log per
//!   collection. Single process, no network.
//! - [`MongoDriver`]: the official async MongoDB client.
//!
//! The driver is picked once at startup from configuration and injected as
//! an `Arc<dyn Driver>`; nothing below the binary branches on which one is
//! in use.
//!
//! # Usage
//!
//! ```ignore
//! let driver: Arc<dyn Driver> = Arc::new(LocalDriver::open("./db")?);
//! let pages: Collection<Page> = Collection::new(driver, "pages");
//!
//! let page = pages.insert(&new_page).await?;
//! let found = pages.find(&Query::all().eq("parent", "0"), None).await?;
//! ```

mod collection;
pub mod id;
pub mod local;
pub mod mongo;
pub mod query;

use async_trait::async_trait;

pub use collection::{Collection, from_document, to_document};
pub use id::{DriverKind, EntityId, InvalidIdError, is_entity_id, is_equal_ids, to_entity_id};
pub use local::LocalDriver;
pub use mongo::MongoDriver;
pub use query::{
    Condition, Document, ID_FIELD, Projection, Query, QueryValue, RemoveOptions, Update,
    UpdateOptions, UpdateOutcome,
};

use local::LogError;

/// Capability contract shared by every backing store.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `insert` returns the stored document, including its generated `_id`
/// - `find` returns an empty vector, never an error, when nothing matches
/// - `find_one` returns `None`, never an error, when nothing matches
/// - `update` and `remove` touch at most one document unless `multi` is set
/// - store errors are surfaced, never swallowed
#[async_trait]
pub trait Driver: Send + Sync {
    /// Which store this driver talks to.
    fn kind(&self) -> DriverKind;

    /// Convert a wire-level identifier into this driver's native form.
    fn to_entity_id(&self, raw: &str) -> Result<EntityId, InvalidIdError> {
        to_entity_id(self.kind(), raw)
    }

    /// Persist a new document.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, DriverError>;

    /// All documents matching `query`.
    async fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, DriverError>;

    /// The first document matching `query`.
    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, DriverError>;

    /// Apply `update` to the documents matching `query`.
    async fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome<Document>, DriverError>;

    /// Delete the documents matching `query`, returning how many were removed.
    async fn remove(
        &self,
        collection: &str,
        query: &Query,
        options: RemoveOptions,
    ) -> Result<u64, DriverError>;
}

/// Errors surfaced by a storage driver.
#[derive(Debug)]
pub enum DriverError {
    /// I/O error in the embedded store.
    Io(std::io::Error),
    /// The embedded store's log could not be written or read.
    Log(LogError),
    /// A document could not be converted to or from JSON.
    Serialization(serde_json::Error),
    /// A document could not be converted to or from BSON.
    Bson(String),
    /// MongoDB rejected the operation.
    Mongo(mongodb::error::Error),
    /// A document with this `_id` already exists.
    DuplicateId(String),
    /// An identifier was not valid for this driver.
    InvalidId(InvalidIdError),
    /// The request cannot be expressed for this store.
    InvalidOperation(String),
    /// Collection names are limited to ASCII letters, digits, `_` and `-`.
    InvalidCollectionName(String),
    /// A lock guarding a collection was poisoned.
    LockPoisoned,
    /// A partial log write could not be rolled back; the collection refuses
    /// writes until it is reopened.
    LogPoisoned(std::path::PathBuf),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Log(e) => write!(f, "log error: {e}"),
            Self::Serialization(e) => write!(f, "serialization error: {e}"),
            Self::Bson(message) => write!(f, "BSON conversion error: {message}"),
            Self::Mongo(e) => write!(f, "MongoDB error: {e}"),
            Self::DuplicateId(id) => write!(f, "a document with _id '{id}' already exists"),
            Self::InvalidId(e) => write!(f, "invalid identifier: {e}"),
            Self::InvalidOperation(message) => write!(f, "invalid operation: {message}"),
            Self::InvalidCollectionName(name) => write!(f, "invalid collection name: '{name}'"),
            Self::LockPoisoned => write!(f, "collection lock poisoned"),
            Self::LogPoisoned(path) => write!(
                f,
                "log '{}' holds an unrecoverable partial write; reopen to recover",
                path.display()
            ),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Log(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Mongo(e) => Some(e),
            Self::InvalidId(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<LogError> for DriverError {
    fn from(e: LogError) -> Self {
        Self::Log(e)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<mongodb::error::Error> for DriverError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Mongo(e)
    }
}

impl From<InvalidIdError> for DriverError {
    fn from(e: InvalidIdError) -> Self {
        Self::InvalidId(e)
    }
}
