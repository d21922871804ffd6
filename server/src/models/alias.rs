//! Aliases: friendly URL slugs resolving to entities.
//!
//! # Invariants
//!
//! - A slug is held by at most one alias.
//! - When a page's slug changes the old alias stays, marked `deprecated`,
//!   so existing links keep resolving.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    ModelError, find_by_id, is_present, reject_blank, remove_by_id, require_fields, update_by_id,
};
use crate::database::{Collection, Document, Driver, Query, RemoveOptions, Update, UpdateOptions};

/// Collection holding aliases.
pub const ALIASES_COLLECTION: &str = "aliases";

/// Kind of entity an alias points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    Page,
}

/// A stored alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    /// Identifier of the target entity.
    #[serde(rename = "id")]
    pub entity_id: String,
    #[serde(rename = "type")]
    pub kind: AliasKind,
    #[serde(default)]
    pub deprecated: bool,
}

/// Alias fields supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AliasKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
}

impl AliasData {
    /// A live alias from `slug` to the page `page_id`.
    #[must_use]
    pub fn for_page(slug: &str, page_id: &str) -> Self {
        Self {
            slug: Some(slug.to_string()),
            entity_id: Some(page_id.to_string()),
            kind: Some(AliasKind::Page),
            deprecated: None,
        }
    }
}

#[derive(Serialize)]
struct NewAlias<'a> {
    slug: &'a str,
    id: &'a str,
    #[serde(rename = "type")]
    kind: AliasKind,
    deprecated: bool,
}

/// Repository for [`Alias`]es.
#[derive(Clone)]
pub struct AliasRepository {
    collection: Collection<Alias>,
}

impl AliasRepository {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            collection: Collection::new(driver, ALIASES_COLLECTION),
        }
    }

    /// Insert an alias. `slug`, `id` and `type` are required and the slug must be unused.
    pub async fn insert(&self, data: &AliasData) -> Result<Alias, ModelError> {
        require_fields(
            "alias",
            &[
                ("slug", is_present(data.slug.as_deref())),
                ("id", is_present(data.entity_id.as_deref())),
                ("type", data.kind.is_some()),
            ],
        )?;
        let (Some(slug), Some(entity_id), Some(kind)) =
            (data.slug.as_deref(), data.entity_id.as_deref(), data.kind)
        else {
            return Err(ModelError::Validation {
                entity: "alias",
                missing: vec!["slug", "id", "type"],
            });
        };

        if self.get(slug).await?.is_some() {
            return Err(slug_taken(slug));
        }

        let draft = NewAlias {
            slug,
            id: entity_id,
            kind,
            deprecated: data.deprecated.unwrap_or(false),
        };
        Ok(self.collection.insert(&draft).await?)
    }

    /// Apply the fields present in `data` to an existing alias.
    pub async fn update(&self, id: &str, data: &AliasData) -> Result<Alias, ModelError> {
        reject_blank(
            "alias",
            &[
                ("slug", data.slug.as_deref()),
                ("id", data.entity_id.as_deref()),
            ],
        )?;
        if let Some(slug) = data.slug.as_deref()
            && let Some(holder) = self.get(slug).await?
            && holder.id != id
        {
            return Err(slug_taken(slug));
        }
        update_by_id(&self.collection, "alias", id, data).await
    }

    /// The alias holding `slug`.
    pub async fn get(&self, slug: &str) -> Result<Option<Alias>, ModelError> {
        Ok(self
            .collection
            .find_one(&Query::all().eq("slug", slug), None)
            .await?)
    }

    /// Load an alias by its own identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Alias>, ModelError> {
        find_by_id(&self.collection, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<Alias>, ModelError> {
        Ok(self.collection.find(&Query::all(), None).await?)
    }

    /// Every alias, current or deprecated, pointing at `entity_id`.
    pub async fn get_by_entity(&self, entity_id: &str) -> Result<Vec<Alias>, ModelError> {
        Ok(self
            .collection
            .find(&Query::all().eq("id", entity_id), None)
            .await?)
    }

    /// Mark the alias holding `slug` as deprecated.
    pub async fn mark_deprecated(&self, slug: &str) -> Result<Alias, ModelError> {
        let mut set = Document::new();
        set.insert("deprecated".to_string(), serde_json::Value::Bool(true));

        self.collection
            .update(
                &Query::all().eq("slug", slug),
                &Update::Set(set),
                UpdateOptions::returning(),
            )
            .await?
            .into_documents()
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::NotFound {
                entity: "alias",
                id: slug.to_string(),
            })
    }

    /// Remove an alias by its own identifier. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, ModelError> {
        remove_by_id(&self.collection, id).await
    }

    /// Remove every alias pointing at `entity_id`.
    pub async fn remove_by_entity(&self, entity_id: &str) -> Result<u64, ModelError> {
        Ok(self
            .collection
            .remove(
                &Query::all().eq("id", entity_id),
                RemoveOptions { multi: true },
            )
            .await?)
    }
}

fn slug_taken(slug: &str) -> ModelError {
    ModelError::Conflict {
        entity: "alias",
        message: format!("slug '{slug}' is already in use"),
    }
}
