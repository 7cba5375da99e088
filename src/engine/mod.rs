/// Catalog engine
///
/// Every operation loads a fresh snapshot, validates against it, and only
/// then writes through the storage adapter. Once a check fails nothing has
/// been written. No lock is held between the read and the write: two
/// concurrent callers may both pass validation and the later write wins.

pub mod count;
pub mod response;

#[cfg(test)]
mod tests;

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::state::data::{Category, CategoryId, ImageRef, Item, Location, NodeRef, MAX_IMAGES};
use crate::state::CatalogStore;
use crate::tree::{index::same_name, resolve, Snapshot};

/// Allowed characters of category and item names
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9 _,.\-]+$").expect("name pattern compiles"));

/// Digits in an item uid
pub const UID_LEN: usize = 10;

/// Draws before giving up on finding an unused uid
const UID_ATTEMPTS: usize = 64;

/// Trim and check a category or item name.
///
/// Names made only of dots are refused since `.` and `..` are path syntax.
pub fn validate_name(name: &str) -> CatalogResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || !NAME_PATTERN.is_match(trimmed)
        || trimmed.chars().all(|c| c == '.')
    {
        return Err(CatalogError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Ten independently drawn decimal digits
pub fn generate_uid<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..UID_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Draw uids until one is not taken in `snapshot`
fn fresh_uid<R: Rng + ?Sized>(snapshot: &Snapshot, rng: &mut R) -> CatalogResult<String> {
    for _ in 0..UID_ATTEMPTS {
        let uid = generate_uid(rng);
        if snapshot.item(&uid).is_none() {
            return Ok(uid);
        }
        debug!("🎲 Drew uid {} which is taken, drawing again", uid);
    }
    Err(CatalogError::UidSpaceExhausted)
}

/// Result of a move request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveOutcome {
    Moved,
    /// The node already sat at the destination; nothing was written
    Unchanged,
}

/// Rows removed by a delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Removed {
    pub categories: Vec<CategoryId>,
    pub items: Vec<String>,
}

/// Contents of one category, as an explorer view shows them
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: Option<CategoryId>,
    pub path: String,
    pub display: String,
    /// Path of the enclosing category; None at the root
    pub parent_path: Option<String>,
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
}

/// One searchable node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexEntry {
    Category {
        id: CategoryId,
        name: String,
        path: String,
    },
    Item {
        uid: String,
        name: String,
        path: String,
    },
}

/// Full dump of both tables
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
}

/// The tree-path resolution and mutation engine over one storage adapter
pub struct Catalog<S> {
    store: S,
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Catalog { store }
    }

    /// Read both tables into a fresh snapshot
    pub fn snapshot(&self) -> CatalogResult<Snapshot> {
        Ok(Snapshot::load(&self.store)?)
    }

    fn locate(snapshot: &Snapshot, location: &Location) -> CatalogResult<Option<CategoryId>> {
        match location {
            Location::Root => Ok(None),
            Location::Id(id) => snapshot.require_category(*id).map(|c| Some(c.id)),
            Location::Path(path) => resolve(snapshot, path),
        }
    }

    fn ensure_unique_category(
        snapshot: &Snapshot,
        parent: Option<CategoryId>,
        name: &str,
        except: Option<CategoryId>,
    ) -> CatalogResult<()> {
        let clash = snapshot
            .child_categories(parent)
            .any(|c| Some(c.id) != except && same_name(&c.name, name));
        if clash {
            return Err(CatalogError::DuplicateName {
                name: name.to_string(),
                parent: snapshot.breadcrumb_path(parent)?,
            });
        }
        Ok(())
    }

    fn ensure_unique_item(
        snapshot: &Snapshot,
        category: Option<CategoryId>,
        name: &str,
        except: Option<&str>,
    ) -> CatalogResult<()> {
        let clash = snapshot
            .items_in(category)
            .any(|i| Some(i.uid.as_str()) != except && same_name(&i.name, name));
        if clash {
            return Err(CatalogError::DuplicateName {
                name: name.to_string(),
                parent: snapshot.breadcrumb_path(category)?,
            });
        }
        Ok(())
    }

    /// Category id at `path`; None for the root
    pub fn resolve_path(&self, path: &str) -> CatalogResult<Option<CategoryId>> {
        resolve(&self.snapshot()?, path)
    }

    pub fn create_category(&mut self, name: &str, parent: &Location) -> CatalogResult<CategoryId> {
        let snapshot = self.snapshot()?;
        let name = validate_name(name)?;
        let parent_id = Self::locate(&snapshot, parent)?;
        Self::ensure_unique_category(&snapshot, parent_id, &name, None)?;
        let parent_path = snapshot.breadcrumb_path(parent_id)?;

        let id = self.store.create_category(&name, parent_id)?;
        info!("📂 Created category #{} {:?} in {}", id, name, parent_path);
        Ok(id)
    }

    /// Create an empty item (count 0, no images) and return its new uid
    pub fn create_item(&mut self, name: &str, parent: &Location) -> CatalogResult<String> {
        let snapshot = self.snapshot()?;
        let name = validate_name(name)?;
        let category_id = Self::locate(&snapshot, parent)?;
        Self::ensure_unique_item(&snapshot, category_id, &name, None)?;
        let parent_path = snapshot.breadcrumb_path(category_id)?;

        let uid = fresh_uid(&snapshot, &mut rand::thread_rng())?;
        self.store.create_item(&uid, &name, category_id, now())?;
        info!("📄 Created item {} {:?} in {}", uid, name, parent_path);
        Ok(uid)
    }

    /// Re-parent a category or re-file an item under the category at `destination`.
    pub fn move_node(&mut self, node: &NodeRef, destination: &str) -> CatalogResult<MoveOutcome> {
        let snapshot = self.snapshot()?;
        let target = resolve(&snapshot, destination)?;
        let target_path = snapshot.breadcrumb_path(target)?;

        match node {
            NodeRef::Category(id) => {
                let category = snapshot.require_category(*id)?;
                // A category may not land inside its own subtree (or on itself)
                if let Some(target_id) = target {
                    if snapshot.ancestor_ids(target_id)?.contains(id) {
                        return Err(CatalogError::Cycle);
                    }
                }
                if category.parent_id == target {
                    debug!("{} already in {}, nothing to do", node, target_path);
                    return Ok(MoveOutcome::Unchanged);
                }
                Self::ensure_unique_category(&snapshot, target, &category.name, Some(*id))?;
                self.store.update_category_parent(*id, target)?;
            }
            NodeRef::Item(uid) => {
                let item = snapshot.require_item(uid)?;
                if item.category_id == target {
                    debug!("{} already in {}, nothing to do", node, target_path);
                    return Ok(MoveOutcome::Unchanged);
                }
                Self::ensure_unique_item(&snapshot, target, &item.name, Some(uid.as_str()))?;
                self.store.update_item_category(uid, target)?;
            }
        }

        info!("🚚 Moved {} to {}", node, target_path);
        Ok(MoveOutcome::Moved)
    }

    /// Delete an item, or a category together with every category below it.
    ///
    /// A category is only deleted when no item sits anywhere in its subtree.
    pub fn delete(&mut self, node: &NodeRef) -> CatalogResult<Removed> {
        let snapshot = self.snapshot()?;

        match node {
            NodeRef::Item(uid) => {
                let item = snapshot.require_item(uid)?;
                if !item.images.is_empty() {
                    // Image files are left in place; see DESIGN.md
                    warn!(
                        "🖼️  Item {} had {} image(s) that stay in external storage",
                        uid,
                        item.images.len()
                    );
                }
                self.store.delete_item_row(uid)?;
                info!("🗑️  Deleted item {} {:?}", uid, item.name);
                Ok(Removed {
                    categories: Vec::new(),
                    items: vec![uid.clone()],
                })
            }
            NodeRef::Category(id) => {
                let category = snapshot.require_category(*id)?;
                if snapshot.subtree_has_items(*id) {
                    return Err(CatalogError::NotEmpty);
                }

                // Collected in full before the first delete; children go before parents
                let descendants = snapshot.descendant_ids(*id);
                for cid in descendants.iter().rev() {
                    self.store.delete_category_row(*cid)?;
                }
                self.store.delete_category_row(*id)?;

                info!(
                    "🗑️  Deleted category #{} {:?} and {} sub-categories",
                    id,
                    category.name,
                    descendants.len()
                );
                let mut categories = vec![*id];
                categories.extend(descendants);
                Ok(Removed {
                    categories,
                    items: Vec::new(),
                })
            }
        }
    }

    /// Rename an item and set its count from an arithmetic expression
    pub fn edit_item(&mut self, uid: &str, new_name: &str, count_expression: &str) -> CatalogResult<Item> {
        let snapshot = self.snapshot()?;
        let item = snapshot.require_item(uid)?;
        let name = validate_name(new_name)?;
        Self::ensure_unique_item(&snapshot, item.category_id, &name, Some(uid))?;

        let count = count::evaluate(count_expression, item.count);
        let timestamp = now();
        self.store.update_item_fields(uid, &name, count, timestamp)?;

        info!("✏️  Updated item {} {:?} count {}", uid, name, count);
        Ok(Item {
            name,
            count,
            timestamp,
            ..item.clone()
        })
    }

    /// Append an image to an item
    pub fn add_image(&mut self, uid: &str, image: ImageRef) -> CatalogResult<Item> {
        let snapshot = self.snapshot()?;
        let mut item = snapshot.require_item(uid)?.clone();
        if item.images.len() >= MAX_IMAGES {
            return Err(CatalogError::TooManyImages(MAX_IMAGES));
        }

        item.images.push(image);
        item.timestamp = now();
        self.store.update_item_images(uid, &item.images, item.timestamp)?;
        debug!("🖼️  Item {} now has {} image(s)", uid, item.images.len());
        Ok(item)
    }

    /// Detach the image at `index`, returning it (its files are not touched)
    pub fn remove_image(&mut self, uid: &str, index: usize) -> CatalogResult<ImageRef> {
        let snapshot = self.snapshot()?;
        let mut item = snapshot.require_item(uid)?.clone();
        if index >= item.images.len() {
            return Err(CatalogError::ImageIndex(index));
        }

        let removed = item.images.remove(index);
        self.store.update_item_images(uid, &item.images, now())?;
        debug!("🖼️  Item {} now has {} image(s)", uid, item.images.len());
        Ok(removed)
    }

    /// Absolute path of a category (None is the root)
    pub fn breadcrumb_path(&self, id: Option<CategoryId>) -> CatalogResult<String> {
        let snapshot = self.snapshot()?;
        if let Some(id) = id {
            snapshot.require_category(id)?;
        }
        snapshot.breadcrumb_path(id)
    }

    /// Path of a category itself, or of the category holding an item
    pub fn get_path(&self, node: &NodeRef) -> CatalogResult<String> {
        let snapshot = self.snapshot()?;
        let id = match node {
            NodeRef::Category(id) => snapshot.require_category(*id)?.id,
            NodeRef::Item(uid) => match snapshot.require_item(uid)?.category_id {
                Some(id) => id,
                None => return snapshot.breadcrumb_path(None),
            },
        };
        snapshot.breadcrumb_path(Some(id))
    }

    /// Sub-categories and items of one category, each sorted by name
    pub fn list(&self, location: &Location) -> CatalogResult<Listing> {
        let snapshot = self.snapshot()?;
        let id = Self::locate(&snapshot, location)?;

        let parent_path = match id {
            None => None,
            Some(id) => {
                let parent = snapshot.require_category(id)?.parent_id;
                Some(snapshot.breadcrumb_path(parent)?)
            }
        };

        let mut categories: Vec<Category> = snapshot.child_categories(id).cloned().collect();
        categories.sort_by_key(|c| c.name.to_lowercase());
        let mut items: Vec<Item> = snapshot.items_in(id).cloned().collect();
        items.sort_by_key(|i| i.name.to_lowercase());

        Ok(Listing {
            id,
            path: snapshot.breadcrumb_path(id)?,
            display: snapshot.display_path(id)?,
            parent_path,
            categories,
            items,
        })
    }

    pub fn get_item(&self, uid: &str) -> CatalogResult<Item> {
        Ok(self.snapshot()?.require_item(uid)?.clone())
    }

    /// Every category and item with its path, for client-side search
    pub fn search_index(&self) -> CatalogResult<Vec<IndexEntry>> {
        let snapshot = self.snapshot()?;
        let mut index = Vec::with_capacity(snapshot.categories().len() + snapshot.items().len());

        for category in snapshot.categories() {
            index.push(IndexEntry::Category {
                id: category.id,
                name: category.name.clone(),
                path: snapshot.breadcrumb_path(Some(category.id))?,
            });
        }
        for item in snapshot.items() {
            index.push(IndexEntry::Item {
                uid: item.uid.clone(),
                name: item.name.clone(),
                path: snapshot.breadcrumb_path(item.category_id)?,
            });
        }

        Ok(index)
    }

    pub fn export(&self) -> CatalogResult<Export> {
        let snapshot = self.snapshot()?;
        Ok(Export {
            categories: snapshot.categories().to_vec(),
            items: snapshot.items().to_vec(),
        })
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Catalog<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("store", &self.store).finish()
    }
}
