//! Uploaded file metadata. The bytes themselves live outside the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ModelError, find_by_id, is_present, remove_by_id, require_fields, update_by_id};
use crate::database::{Collection, Driver, Query};

/// Collection holding file metadata.
pub const FILES_COLLECTION: &str = "files";

/// A stored file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    #[serde(rename = "_id")]
    pub id: String,
    /// Original name as uploaded.
    pub name: String,
    /// Name on disk.
    pub filename: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// File fields supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Repository for [`File`] records.
#[derive(Clone)]
pub struct FileRepository {
    collection: Collection<File>,
}

impl FileRepository {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            collection: Collection::new(driver, FILES_COLLECTION),
        }
    }

    /// Insert a file record. `name`, `filename` and `path` are required.
    pub async fn insert(&self, data: &FileData) -> Result<File, ModelError> {
        require_fields(
            "file",
            &[
                ("name", is_present(data.name.as_deref())),
                ("filename", is_present(data.filename.as_deref())),
                ("path", is_present(data.path.as_deref())),
            ],
        )?;
        Ok(self.collection.insert(data).await?)
    }

    /// Apply the fields present in `data` to an existing file record.
    pub async fn update(&self, id: &str, data: &FileData) -> Result<File, ModelError> {
        update_by_id(&self.collection, "file", id, data).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<File>, ModelError> {
        find_by_id(&self.collection, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<File>, ModelError> {
        Ok(self.collection.find(&Query::all(), None).await?)
    }

    /// The record for the file stored as `filename`.
    pub async fn get_by_filename(&self, filename: &str) -> Result<Option<File>, ModelError> {
        Ok(self
            .collection
            .find_one(&Query::all().eq("filename", filename), None)
            .await?)
    }

    /// Remove a file record. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, ModelError> {
        remove_by_id(&self.collection, id).await
    }
}
