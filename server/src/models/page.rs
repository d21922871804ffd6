//! Pages: the wiki's content.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ModelError, ROOT_PARENT_ID, find_by_id, is_present, remove_by_id, require_fields, update_by_id};
use crate::database::{Collection, Driver, Query};

/// Collection holding pages.
pub const PAGES_COLLECTION: &str = "pages";

fn root_parent() -> String {
    ROOT_PARENT_ID.to_string()
}

/// A stored page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Structured rich content, stored as-is.
    pub body: Value,
    /// Parent page id, or [`ROOT_PARENT_ID`] for top-level pages.
    #[serde(default = "root_parent")]
    pub parent: String,
    /// Slug of the page's current alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Whether this page sits at the top level.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent == ROOT_PARENT_ID
    }
}

/// Page fields supplied by a caller. Absent fields are left unchanged on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl PageData {
    /// Check the fields an update would set. A present title must not be blank.
    pub fn validate_changes(&self) -> Result<(), ModelError> {
        if self.title.is_some() {
            require_fields("page", &[("title", is_present(self.title.as_deref()))])?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct NewPage<'a> {
    title: &'a str,
    body: &'a Value,
    parent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct PageChanges<'a> {
    #[serde(flatten)]
    data: &'a PageData,
    updated_at: DateTime<Utc>,
}

/// Repository for [`Page`]s.
#[derive(Clone)]
pub struct PageRepository {
    collection: Collection<Page>,
}

impl PageRepository {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            collection: Collection::new(driver, PAGES_COLLECTION),
        }
    }

    /// Insert a page. `title` and `body` are required; `parent` defaults to the root.
    pub async fn insert(&self, data: &PageData) -> Result<Page, ModelError> {
        let body = data.body.as_ref().filter(|body| !body.is_null());
        require_fields(
            "page",
            &[
                ("title", is_present(data.title.as_deref())),
                ("body", body.is_some()),
            ],
        )?;
        let (Some(title), Some(body)) = (data.title.as_deref(), body) else {
            return Err(ModelError::Validation {
                entity: "page",
                missing: vec!["title", "body"],
            });
        };

        let now = Utc::now();
        let draft = NewPage {
            title,
            body,
            parent: data.parent.as_deref().unwrap_or(ROOT_PARENT_ID),
            uri: data.uri.as_deref(),
            created_at: now,
            updated_at: now,
        };
        let page = self.collection.insert(&draft).await?;
        tracing::debug!(page_id = %page.id, "inserted page");
        Ok(page)
    }

    /// Apply the fields present in `data` to an existing page.
    pub async fn update(&self, id: &str, data: &PageData) -> Result<Page, ModelError> {
        data.validate_changes()?;
        let changes = PageChanges {
            data,
            updated_at: Utc::now(),
        };
        update_by_id(&self.collection, "page", id, &changes).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Page>, ModelError> {
        find_by_id(&self.collection, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<Page>, ModelError> {
        Ok(self.collection.find(&Query::all(), None).await?)
    }

    /// Pages whose parent is `parent_id`, in storage order.
    pub async fn get_children(&self, parent_id: &str) -> Result<Vec<Page>, ModelError> {
        Ok(self
            .collection
            .find(&Query::all().eq("parent", parent_id), None)
            .await?)
    }

    /// Remove a page. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, ModelError> {
        remove_by_id(&self.collection, id).await
    }
}
