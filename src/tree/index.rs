//! In-memory snapshot of every category and item for one operation.
//!
//! Nodes live in two arenas (`Vec`s); parent/child relations are plain id
//! lookups through maps built once at load time.

use std::collections::{HashMap, HashSet};

use super::path;
use crate::error::{CatalogError, CatalogResult, StoreResult};
use crate::state::data::{Category, CategoryId, Item};
use crate::state::CatalogStore;

/// Case-insensitive name equality used for sibling uniqueness and path lookup
pub fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Default)]
pub struct Snapshot {
    categories: Vec<Category>,
    items: Vec<Item>,
    category_pos: HashMap<CategoryId, usize>,
    item_pos: HashMap<String, usize>,
    /// Child category positions keyed by parent id (None = root), in scan order
    children: HashMap<Option<CategoryId>, Vec<usize>>,
    /// Item positions keyed by owning category (None = root), in scan order
    items_by_category: HashMap<Option<CategoryId>, Vec<usize>>,
}

impl Snapshot {
    /// One full scan of each table
    pub fn load<S: CatalogStore + ?Sized>(store: &S) -> StoreResult<Self> {
        let categories = store.read_all_categories()?;
        let items = store.read_all_items()?;
        Ok(Self::from_rows(categories, items))
    }

    pub fn from_rows(categories: Vec<Category>, items: Vec<Item>) -> Self {
        let mut snapshot = Snapshot {
            category_pos: HashMap::with_capacity(categories.len()),
            item_pos: HashMap::with_capacity(items.len()),
            ..Default::default()
        };

        for (pos, category) in categories.iter().enumerate() {
            snapshot.category_pos.entry(category.id).or_insert(pos);
            snapshot
                .children
                .entry(category.parent_id)
                .or_default()
                .push(pos);
        }
        for (pos, item) in items.iter().enumerate() {
            snapshot.item_pos.entry(item.uid.clone()).or_insert(pos);
            snapshot
                .items_by_category
                .entry(item.category_id)
                .or_default()
                .push(pos);
        }

        snapshot.categories = categories;
        snapshot.items = items;
        snapshot
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.category_pos.get(&id).map(|&pos| &self.categories[pos])
    }

    pub fn item(&self, uid: &str) -> Option<&Item> {
        self.item_pos.get(uid).map(|&pos| &self.items[pos])
    }

    /// Like `category`, but a missing id is a `NotFound` error
    pub fn require_category(&self, id: CategoryId) -> CatalogResult<&Category> {
        self.category(id)
            .ok_or_else(|| CatalogError::NotFound(format!("category #{}", id)))
    }

    pub fn require_item(&self, uid: &str) -> CatalogResult<&Item> {
        self.item(uid)
            .ok_or_else(|| CatalogError::NotFound(format!("item {}", uid)))
    }

    /// Direct sub-categories of `parent` in backend scan order
    pub fn child_categories(&self, parent: Option<CategoryId>) -> impl Iterator<Item = &Category> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .map(|&pos| &self.categories[pos])
    }

    /// Items filed directly under `category` in backend scan order
    pub fn items_in(&self, category: Option<CategoryId>) -> impl Iterator<Item = &Item> {
        self.items_by_category
            .get(&category)
            .into_iter()
            .flatten()
            .map(|&pos| &self.items[pos])
    }

    /// First child category of `parent` named `name`, ignoring case
    pub fn child_named(&self, parent: Option<CategoryId>, name: &str) -> Option<&Category> {
        self.child_categories(parent).find(|c| same_name(&c.name, name))
    }

    /// First item under `category` named `name`, ignoring case
    pub fn item_named(&self, category: Option<CategoryId>, name: &str) -> Option<&Item> {
        self.items_in(category).find(|i| same_name(&i.name, name))
    }

    /// Root-to-self chain of category ids, `id` last.
    pub fn ancestor_ids(&self, id: CategoryId) -> CatalogResult<Vec<CategoryId>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(cid) = current {
            if !seen.insert(cid) {
                return Err(CatalogError::CycleDetected(id));
            }
            let category = self.require_category(cid)?;
            chain.push(cid);
            current = category.parent_id;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Root-to-self names, the category's own name last
    pub fn ancestor_names(&self, id: CategoryId) -> CatalogResult<Vec<String>> {
        self.ancestor_ids(id)?
            .into_iter()
            .map(|cid| self.require_category(cid).map(|c| c.name.clone()))
            .collect()
    }

    /// Absolute path of a category; None is the root `/`
    pub fn breadcrumb_path(&self, id: Option<CategoryId>) -> CatalogResult<String> {
        match id {
            None => Ok(path::ROOT.to_string()),
            Some(id) => Ok(path::join(self.ancestor_names(id)?)),
        }
    }

    /// Human-readable `Root > A > B` form of the same chain
    pub fn display_path(&self, id: Option<CategoryId>) -> CatalogResult<String> {
        let mut parts = vec!["Root".to_string()];
        if let Some(id) = id {
            parts.extend(self.ancestor_names(id)?);
        }
        Ok(parts.join(" > "))
    }

    /// Every category below `id` (not `id` itself), parents before children
    pub fn descendant_ids(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = vec![id];
        let mut next = 0;

        while next < queue.len() {
            let parent = queue[next];
            next += 1;
            for child in self.child_categories(Some(parent)) {
                if seen.insert(child.id) {
                    out.push(child.id);
                    queue.push(child.id);
                }
            }
        }

        out
    }

    /// Whether `id` or any category below it owns at least one item
    pub fn subtree_has_items(&self, id: CategoryId) -> bool {
        std::iter::once(id)
            .chain(self.descendant_ids(id))
            .any(|cid| self.items_in(Some(cid)).next().is_some())
    }
}
