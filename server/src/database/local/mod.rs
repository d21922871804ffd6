//! Embedded, file-backed driver.
//!
//! Each collection lives in its own log file, `{directory}/{collection}.db`,
//! and is opened lazily the first time it is touched. Collections are shared
//! by every caller holding the same [`LocalDriver`].
//!
//! # Thread Safety
//!
//! The registry map sits behind an `RwLock` so lookups of already-open
//! collections proceed concurrently. Each collection has its own `Mutex`;
//! operations on different collections never contend.
//!
//! # Invariants
//!
//! - Each collection name maps to exactly one open `Datastore`
//! - Collections are never closed for the lifetime of the driver
//! - Collection names are validated before they touch the filesystem

mod datastore;
pub mod log;
mod matcher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

pub use datastore::{Datastore, GENERATED_ID_LENGTH, RecoveryResult};
pub use log::LogError;

use super::query::{Document, Projection, Query, RemoveOptions, Update, UpdateOptions, UpdateOutcome};
use super::{Driver, DriverError, DriverKind};

/// Maximum length of a collection name.
const MAX_COLLECTION_NAME_LENGTH: usize = 64;

/// Driver storing every collection under one directory.
pub struct LocalDriver {
    directory: PathBuf,
    collections: RwLock<HashMap<String, Arc<Mutex<Datastore>>>>,
}

impl LocalDriver {
    /// Open a driver rooted at `directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, DriverError> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;
        tracing::info!("Using embedded store at '{}'", directory.display());
        Ok(Self {
            directory,
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the collection files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get or open the collection called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `name` is not a valid collection name
    /// - The registry lock is poisoned
    /// - The collection file cannot be opened or recovered
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    #[allow(clippy::significant_drop_tightening)] // False positive - we need the lock held during insert
    pub fn collection(&self, name: &str) -> Result<Arc<Mutex<Datastore>>, DriverError> {
        validate_collection_name(name)?;

        {
            let collections = self
                .collections
                .read()
                .map_err(|_| DriverError::LockPoisoned)?;
            if let Some(store) = collections.get(name) {
                return Ok(Arc::clone(store));
            }
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| DriverError::LockPoisoned)?;

        // Another caller may have opened it while we waited for the write lock
        if let Some(store) = collections.get(name) {
            return Ok(Arc::clone(store));
        }

        let path = self.directory.join(format!("{name}.db"));
        let (store, recovery) = Datastore::open(&path)?;
        tracing::info!(
            "Opened collection '{}': {} records replayed, {} documents, {} bytes discarded",
            name,
            recovery.records_replayed,
            recovery.live_documents,
            recovery.discarded_bytes
        );

        let store = Arc::new(Mutex::new(store));
        collections.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn with_collection<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Datastore) -> Result<R, DriverError>,
    ) -> Result<R, DriverError> {
        let store = self.collection(name)?;
        let mut guard = store.lock().map_err(|_| DriverError::LockPoisoned)?;
        f(&mut guard)
    }
}

#[async_trait]
impl Driver for LocalDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Local
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, DriverError> {
        self.with_collection(collection, |store| store.insert(doc))
    }

    async fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, DriverError> {
        self.with_collection(collection, |store| Ok(store.find(query, projection)))
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, DriverError> {
        self.with_collection(collection, |store| Ok(store.find_one(query, projection)))
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome<Document>, DriverError> {
        self.with_collection(collection, |store| store.update(query, update, options))
    }

    async fn remove(
        &self,
        collection: &str,
        query: &Query,
        options: RemoveOptions,
    ) -> Result<u64, DriverError> {
        self.with_collection(collection, |store| store.remove(query, options))
    }
}

/// Validate that a collection name is safe to use as a file name.
///
/// Valid names are non-empty, at most 64 characters, and contain only ASCII
/// letters, digits, `-` and `_`.
pub fn validate_collection_name(name: &str) -> Result<(), DriverError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DriverError::InvalidCollectionName(name.to_string()))
    }
}
