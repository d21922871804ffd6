//! Typed view of one collection.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    Document, Driver, DriverError, DriverKind, EntityId, InvalidIdError, Projection, Query,
    RemoveOptions, Update, UpdateOptions, UpdateOutcome,
};

/// Binds a driver and a collection name to a document shape `T`.
///
/// Documents cross the driver boundary as JSON objects; this wrapper does
/// the conversion in both directions so repositories only handle `T`.
pub struct Collection<T> {
    driver: Arc<dyn Driver>,
    name: &'static str,
    _shape: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            name: self.name,
            _shape: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a typed collection on top of `driver`.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, name: &'static str) -> Self {
        Self {
            driver,
            name,
            _shape: PhantomData,
        }
    }

    /// Name of the underlying collection.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Which store the collection lives in.
    #[must_use]
    pub fn kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Convert a wire-level identifier for this collection's driver.
    pub fn entity_id(&self, raw: &str) -> Result<EntityId, InvalidIdError> {
        self.driver.to_entity_id(raw)
    }

    /// Insert `draft` and return the stored document.
    ///
    /// The draft is usually `T` without its `_id`; the driver assigns one.
    pub async fn insert<D: Serialize + Sync>(&self, draft: &D) -> Result<T, DriverError> {
        let doc = to_document(draft)?;
        let stored = self.driver.insert(self.name, doc).await?;
        from_document(stored)
    }

    /// All documents matching `query`.
    pub async fn find(
        &self,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Vec<T>, DriverError> {
        self.driver
            .find(self.name, query, projection)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// The first document matching `query`.
    pub async fn find_one(
        &self,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<T>, DriverError> {
        self.driver
            .find_one(self.name, query, projection)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Apply `update` to the documents matching `query`.
    pub async fn update(
        &self,
        query: &Query,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome<T>, DriverError> {
        self.driver
            .update(self.name, query, update, options)
            .await?
            .try_map(from_document)
    }

    /// Remove the documents matching `query`.
    pub async fn remove(&self, query: &Query, options: RemoveOptions) -> Result<u64, DriverError> {
        self.driver.remove(self.name, query, options).await
    }
}

/// Serialize `value` into a document.
///
/// # Errors
///
/// Fails if `value` does not serialize to a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DriverError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DriverError::InvalidOperation(format!(
            "documents must serialize to a JSON object, got {other}"
        ))),
    }
}

/// Deserialize a document into `T`.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, DriverError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
