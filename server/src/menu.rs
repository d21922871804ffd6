//! Navigation tree construction.
//!
//! The menu is rebuilt from two flat collections: pages (content) and page
//! orders (membership and sibling order). Starting at the root sentinel,
//! each parent's order record is walked in sequence and every listed page
//! becomes a node whose children come from that page's own order record.
//!
//! # Reconciliation
//!
//! The page order is authoritative for *which* pages appear and in *what*
//! order; the page collection is authoritative for *what* they contain.
//! Mismatches never abort the build:
//!
//! - an ordered id with no page is a stale entry: logged and skipped
//! - an id listed twice under the same parent is placed once
//! - an id already on the current path (a cycle) is skipped
//! - a page listed by no order record does not appear
//!
//! # Invariants
//!
//! - The same inputs always produce the same tree.
//! - No node sits deeper than `max_depth`; the root's children are depth 1.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Page, PageOrder};

/// Depth bound used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// One entry in the navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuNode<'a> {
    #[serde(flatten)]
    pub page: &'a Page,
    pub children: Vec<MenuNode<'a>>,
}

/// Build the navigation tree below `root`.
///
/// A `max_depth` of zero yields an empty tree.
#[must_use]
pub fn build_menu<'a>(
    pages: &'a [Page],
    orders: &[PageOrder],
    root: &str,
    max_depth: usize,
) -> Vec<MenuNode<'a>> {
    let pages_by_id: HashMap<&str, &Page> =
        pages.iter().map(|page| (page.id.as_str(), page)).collect();
    let orders_by_parent: HashMap<&str, &PageOrder> = orders
        .iter()
        .map(|order| (order.page.as_str(), order))
        .collect();

    let builder = MenuBuilder {
        pages: &pages_by_id,
        orders: &orders_by_parent,
        max_depth,
    };
    let mut path: Vec<&str> = vec![root];
    builder.children_of(root, 1, &mut path)
}

struct MenuBuilder<'p, 'a> {
    pages: &'p HashMap<&'a str, &'a Page>,
    orders: &'p HashMap<&'p str, &'p PageOrder>,
    max_depth: usize,
}

impl<'a> MenuBuilder<'_, 'a> {
    fn children_of<'s>(
        &self,
        parent: &str,
        depth: usize,
        path: &mut Vec<&'s str>,
    ) -> Vec<MenuNode<'a>>
    where
        'a: 's,
    {
        if depth > self.max_depth {
            return Vec::new();
        }
        let Some(order) = self.orders.get(parent) else {
            return Vec::new();
        };

        let mut placed = HashSet::new();
        let mut nodes = Vec::with_capacity(order.order.len());

        for child_id in &order.order {
            let Some(&page) = self.pages.get(child_id.as_str()) else {
                tracing::warn!(parent_id = %parent, page_id = %child_id, "page order references a missing page");
                continue;
            };
            if !placed.insert(child_id.as_str()) {
                tracing::warn!(parent_id = %parent, page_id = %child_id, "page listed twice in one order");
                continue;
            }
            if path.contains(&page.id.as_str()) {
                tracing::warn!(parent_id = %parent, page_id = %child_id, "page order forms a cycle");
                continue;
            }

            path.push(page.id.as_str());
            let children = self.children_of(&page.id, depth + 1, path);
            path.pop();

            nodes.push(MenuNode { page, children });
        }

        nodes
    }
}

/// Owned inputs for building a menu.
///
/// Holds the pages and orders loaded from the store so the borrowed tree can
/// be built from them.
#[derive(Debug, Clone, Default)]
pub struct MenuSource {
    pub pages: Vec<Page>,
    pub orders: Vec<PageOrder>,
}

impl MenuSource {
    /// The tree below the root sentinel.
    #[must_use]
    pub fn tree(&self, max_depth: usize) -> Vec<MenuNode<'_>> {
        build_menu(
            &self.pages,
            &self.orders,
            crate::models::ROOT_PARENT_ID,
            max_depth,
        )
    }
}
