//! Page orders: the sibling sequence under each parent.
//!
//! One record per parent id. The record's `order` lists the ids of the
//! parent's children in display order, without duplicates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    ModelError, find_by_id, is_present, reject_blank, remove_by_id, require_fields, update_by_id,
};
use crate::database::{Collection, Driver, Query, RemoveOptions, Update, UpdateOptions, to_document};

/// Collection holding page orders.
pub const PAGE_ORDER_COLLECTION: &str = "page_order";

/// A stored page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOrder {
    #[serde(rename = "_id")]
    pub id: String,
    /// Parent page id, or the root sentinel.
    pub page: String,
    /// Child page ids in display order.
    #[serde(default)]
    pub order: Vec<String>,
}

impl PageOrder {
    /// Whether `child` is listed.
    #[must_use]
    pub fn contains(&self, child: &str) -> bool {
        self.order.iter().any(|id| id == child)
    }
}

/// Page order fields supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageOrderData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
}

#[derive(Serialize)]
struct NewPageOrder<'a> {
    page: &'a str,
    order: Vec<&'a str>,
}

#[derive(Serialize)]
struct OrderChange<'a> {
    order: &'a [String],
}

/// Repository for [`PageOrder`]s.
#[derive(Clone)]
pub struct PageOrderRepository {
    collection: Collection<PageOrder>,
}

impl PageOrderRepository {
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            collection: Collection::new(driver, PAGE_ORDER_COLLECTION),
        }
    }

    /// Insert a page order. `page` is required and may hold only one record.
    pub async fn insert(&self, data: &PageOrderData) -> Result<PageOrder, ModelError> {
        require_fields("page order", &[("page", is_present(data.page.as_deref()))])?;
        let Some(page) = data.page.as_deref() else {
            return Err(ModelError::Validation {
                entity: "page order",
                missing: vec!["page"],
            });
        };

        if self.get_by_parent(page).await?.is_some() {
            return Err(parent_taken(page));
        }

        let draft = NewPageOrder {
            page,
            order: dedup(data.order.iter().flatten().map(String::as_str)),
        };
        Ok(self.collection.insert(&draft).await?)
    }

    /// Apply the fields present in `data` to an existing page order.
    ///
    /// Moving the record to a parent that already has one fails with `Conflict`.
    pub async fn update(&self, id: &str, data: &PageOrderData) -> Result<PageOrder, ModelError> {
        reject_blank("page order", &[("page", data.page.as_deref())])?;
        if let Some(page) = data.page.as_deref()
            && let Some(holder) = self.get_by_parent(page).await?
            && holder.id != id
        {
            return Err(parent_taken(page));
        }

        let data = PageOrderData {
            page: data.page.clone(),
            order: data
                .order
                .as_ref()
                .map(|order| dedup(order.iter().map(String::as_str)).into_iter().map(str::to_string).collect()),
        };
        update_by_id(&self.collection, "page order", id, &data).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<PageOrder>, ModelError> {
        find_by_id(&self.collection, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<PageOrder>, ModelError> {
        Ok(self.collection.find(&Query::all(), None).await?)
    }

    /// The order record for `parent`.
    pub async fn get_by_parent(&self, parent: &str) -> Result<Option<PageOrder>, ModelError> {
        Ok(self
            .collection
            .find_one(&Query::all().eq("page", parent), None)
            .await?)
    }

    /// Append `child` to `parent`'s order, creating the record if needed.
    ///
    /// A child that is already listed keeps its position.
    pub async fn push(&self, parent: &str, child: &str) -> Result<PageOrder, ModelError> {
        let current = self.get_by_parent(parent).await?;
        if let Some(current) = &current
            && current.contains(child)
        {
            return Ok(current.clone());
        }

        let mut order = current.map(|current| current.order).unwrap_or_default();
        order.push(child.to_string());
        self.set_order(parent, &order).await
    }

    /// Drop `child` from `parent`'s order. Returns the record, if there is one.
    pub async fn remove_child(
        &self,
        parent: &str,
        child: &str,
    ) -> Result<Option<PageOrder>, ModelError> {
        let Some(current) = self.get_by_parent(parent).await? else {
            return Ok(None);
        };
        if !current.contains(child) {
            return Ok(Some(current));
        }

        let order: Vec<String> = current.order.into_iter().filter(|id| id != child).collect();
        self.set_order(parent, &order).await.map(Some)
    }

    /// Move `child` directly above `above` in `parent`'s order.
    ///
    /// `child` is inserted if it isn't listed yet. Fails with `NotFound` when
    /// `above` isn't listed under `parent`.
    pub async fn put_above(
        &self,
        parent: &str,
        child: &str,
        above: &str,
    ) -> Result<PageOrder, ModelError> {
        let order = self
            .get_by_parent(parent)
            .await?
            .map(|current| current.order)
            .unwrap_or_default();
        let order = place_above(order, child, above).ok_or_else(|| ModelError::NotFound {
            entity: "page order entry",
            id: above.to_string(),
        })?;
        self.set_order(parent, &order).await
    }

    /// Remove `parent`'s order record. Returns whether it existed.
    pub async fn remove_by_parent(&self, parent: &str) -> Result<bool, ModelError> {
        let removed = self
            .collection
            .remove(&Query::all().eq("page", parent), RemoveOptions::default())
            .await?;
        Ok(removed > 0)
    }

    /// Remove a page order by its own identifier. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, ModelError> {
        remove_by_id(&self.collection, id).await
    }

    async fn set_order(&self, parent: &str, order: &[String]) -> Result<PageOrder, ModelError> {
        let set = to_document(&OrderChange { order })?;
        let options = UpdateOptions {
            upsert: true,
            ..UpdateOptions::returning()
        };
        self.collection
            .update(&Query::all().eq("page", parent), &Update::Set(set), options)
            .await?
            .into_documents()
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::NotFound {
                entity: "page order",
                id: parent.to_string(),
            })
    }
}

fn parent_taken(page: &str) -> ModelError {
    ModelError::Conflict {
        entity: "page order",
        message: format!("an order for parent '{page}' already exists"),
    }
}

/// Keep the first occurrence of each id.
fn dedup<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// `order` with `child` moved directly before `above`, or `None` if `above` is absent.
fn place_above(mut order: Vec<String>, child: &str, above: &str) -> Option<Vec<String>> {
    if child == above {
        return order.iter().any(|id| id == above).then_some(order);
    }
    order.retain(|id| id != child);
    let index = order.iter().position(|id| id == above)?;
    order.insert(index, child.to_string());
    Some(order)
}
