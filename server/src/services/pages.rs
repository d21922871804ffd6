//! Page lifecycle across pages, page orders and aliases.
//!
//! Creating, moving, renaming or deleting a page touches up to three
//! collections. This service performs those writes in a fixed order so the
//! records stay consistent on the normal path. The writes are independent:
//! a failure part way leaves earlier writes in place.
//!
//! # Post-conditions
//!
//! - A created page is listed in its parent's order and owns a live alias.
//! - A moved page is listed under its new parent only.
//! - A deleted page's subtree, aliases and order records are gone.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::Driver;
use crate::menu::MenuSource;
use crate::models::{
    Alias, AliasData, AliasRepository, ModelError, Page, PageData, PageOrderRepository,
    PageRepository, ROOT_PARENT_ID,
};

/// Slug used when a title has no usable characters.
const FALLBACK_SLUG: &str = "page";

/// Changes to a page, plus an optional placement among its siblings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageUpdate {
    #[serde(flatten)]
    pub data: PageData,
    /// Sibling the page should be placed directly above.
    #[serde(default)]
    pub put_above: Option<String>,
}

/// An alias together with the page it points at, if that page still exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAlias {
    pub alias: Alias,
    pub page: Option<Page>,
}

/// Coordinates page, page order and alias writes.
#[derive(Clone)]
pub struct PageService {
    pages: PageRepository,
    orders: PageOrderRepository,
    aliases: AliasRepository,
}

impl PageService {
    #[must_use]
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            pages: PageRepository::new(Arc::clone(&driver)),
            orders: PageOrderRepository::new(Arc::clone(&driver)),
            aliases: AliasRepository::new(driver),
        }
    }

    #[must_use]
    pub const fn pages(&self) -> &PageRepository {
        &self.pages
    }

    #[must_use]
    pub const fn orders(&self) -> &PageOrderRepository {
        &self.orders
    }

    #[must_use]
    pub const fn aliases(&self) -> &AliasRepository {
        &self.aliases
    }

    /// Create a page under its parent, append it to the parent's order and
    /// give it a unique alias derived from `uri` or, failing that, the title.
    pub async fn create(&self, data: PageData) -> Result<Page, ModelError> {
        let parent = data
            .parent
            .clone()
            .unwrap_or_else(|| ROOT_PARENT_ID.to_string());
        self.ensure_parent_exists(&parent).await?;

        let base = data
            .uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .or(data.title.as_deref())
            .map_or_else(|| FALLBACK_SLUG.to_string(), slugify);
        let slug = self.unique_slug(&base).await?;

        let page = self
            .pages
            .insert(&PageData {
                parent: Some(parent.clone()),
                uri: Some(slug.clone()),
                ..data
            })
            .await?;

        self.aliases
            .insert(&AliasData::for_page(&slug, &page.id))
            .await?;
        self.orders.push(&parent, &page.id).await?;

        tracing::info!(page_id = %page.id, parent_id = %parent, slug = %slug, "created page");
        Ok(page)
    }

    /// Update a page's fields, and move, rename or reorder it as requested.
    pub async fn update(&self, id: &str, update: PageUpdate) -> Result<Page, ModelError> {
        let current = self.pages.get(id).await?.ok_or_else(|| page_not_found(id))?;
        let PageUpdate { mut data, put_above } = update;
        data.validate_changes()?;

        let new_parent = data
            .parent
            .clone()
            .filter(|parent| *parent != current.parent);
        if let Some(parent) = &new_parent {
            self.ensure_parent_exists(parent).await?;
            self.ensure_not_descendant(&current.id, parent).await?;
        }
        let target_parent = new_parent.as_deref().unwrap_or(&current.parent);

        if let Some(above) = &put_above {
            let listed = self
                .orders
                .get_by_parent(target_parent)
                .await?
                .is_some_and(|order| order.contains(above));
            if !listed {
                return Err(ModelError::NotFound {
                    entity: "page order entry",
                    id: above.clone(),
                });
            }
        }

        data.uri = match data.uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => {
                Some(self.rename(&current, &slugify(uri)).await?)
            }
            _ => None,
        };

        let page = self.pages.update(id, &data).await?;

        if new_parent.is_some() {
            self.orders.remove_child(&current.parent, id).await?;
        }
        match &put_above {
            Some(above) => {
                self.orders.put_above(target_parent, id, above).await?;
            }
            None if new_parent.is_some() => {
                self.orders.push(target_parent, id).await?;
            }
            None => {}
        }

        if let Some(parent) = &new_parent {
            tracing::info!(page_id = %id, from = %current.parent, to = %parent, "moved page");
        }
        Ok(page)
    }

    /// Delete a page and everything below it, with their aliases and orders.
    ///
    /// Returns the ids of the removed pages, the page itself first.
    pub async fn remove(&self, id: &str) -> Result<Vec<String>, ModelError> {
        let page = self.pages.get(id).await?.ok_or_else(|| page_not_found(id))?;

        let mut removed = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![page.id.clone()];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            for child in self.pages.get_children(&next).await? {
                pending.push(child.id);
            }
            removed.push(next);
        }

        for page_id in &removed {
            self.pages.remove(page_id).await?;
            self.aliases.remove_by_entity(page_id).await?;
            self.orders.remove_by_parent(page_id).await?;
        }
        self.orders.remove_child(&page.parent, &page.id).await?;

        tracing::info!(page_id = %id, removed = removed.len(), "removed page");
        Ok(removed)
    }

    /// Load everything the menu is built from.
    pub async fn load_menu(&self) -> Result<MenuSource, ModelError> {
        Ok(MenuSource {
            pages: self.pages.get_all().await?,
            orders: self.orders.get_all().await?,
        })
    }

    /// Look up `slug` and the page it points at.
    pub async fn resolve_alias(&self, slug: &str) -> Result<Option<ResolvedAlias>, ModelError> {
        let Some(alias) = self.aliases.get(slug).await? else {
            return Ok(None);
        };
        let page = self.pages.get(&alias.entity_id).await?;
        if page.is_none() {
            tracing::warn!(slug = %slug, page_id = %alias.entity_id, "alias points at a missing page");
        }
        Ok(Some(ResolvedAlias { alias, page }))
    }

    async fn ensure_parent_exists(&self, parent: &str) -> Result<(), ModelError> {
        if parent == ROOT_PARENT_ID || self.pages.get(parent).await?.is_some() {
            Ok(())
        } else {
            Err(page_not_found(parent))
        }
    }

    /// Fail if `parent` is `id` itself or sits anywhere below it.
    async fn ensure_not_descendant(&self, id: &str, parent: &str) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        let mut cursor = parent.to_string();
        while cursor != ROOT_PARENT_ID && seen.insert(cursor.clone()) {
            if cursor == id {
                return Err(ModelError::Conflict {
                    entity: "page",
                    message: format!("page '{id}' cannot be moved below itself"),
                });
            }
            match self.pages.get(&cursor).await? {
                Some(ancestor) => cursor = ancestor.parent,
                None => break,
            }
        }
        Ok(())
    }

    /// Point `slug` at `page`, deprecating its previous slug. Returns the slug.
    async fn rename(&self, page: &Page, slug: &str) -> Result<String, ModelError> {
        if page.uri.as_deref() == Some(slug) {
            return Ok(slug.to_string());
        }

        match self.aliases.get(slug).await? {
            Some(existing) if existing.entity_id != page.id => {
                return Err(ModelError::Conflict {
                    entity: "alias",
                    message: format!("slug '{slug}' is already in use"),
                });
            }
            Some(existing) => {
                self.aliases
                    .update(
                        &existing.id,
                        &AliasData {
                            deprecated: Some(false),
                            ..AliasData::default()
                        },
                    )
                    .await?;
            }
            None => {
                self.aliases
                    .insert(&AliasData::for_page(slug, &page.id))
                    .await?;
            }
        }

        if let Some(old) = page.uri.as_deref() {
            match self.aliases.mark_deprecated(old).await {
                Ok(_) | Err(ModelError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::info!(page_id = %page.id, slug = %slug, "renamed page");
        Ok(slug.to_string())
    }

    /// `base`, or `base-2`, `base-3`, ... whichever slug is free first.
    async fn unique_slug(&self, base: &str) -> Result<String, ModelError> {
        if self.aliases.get(base).await?.is_none() {
            return Ok(base.to_string());
        }
        let mut suffix = 2_u32;
        loop {
            let candidate = format!("{base}-{suffix}");
            if self.aliases.get(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

fn page_not_found(id: &str) -> ModelError {
    ModelError::NotFound {
        entity: "page",
        id: id.to_string(),
    }
}

/// Lowercase `text` and join its alphanumeric runs with `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}
