/// State management module
///
/// This module handles all persisted catalog state, including:
/// - The storage adapter contract shared by every backend (this file)
/// - Shared data structures (data.rs)
/// - The SQLite relational backend (library.rs)
/// - The spreadsheet-row backend (sheet.rs) and its workbook (workbook.rs)

pub mod data;
pub mod library;
pub mod sheet;
pub mod workbook;

use crate::error::StoreResult;
use data::{Category, CategoryId, ImageRef, Item};

/// The two persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Category,
    Item,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Category => "category",
            Table::Item => "item",
        }
    }
}

/// Backend-specific address of one persisted row
/// (a SQLite rowid, or a 1-based spreadsheet row number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowHandle(pub i64);

/// Row-level primitives every backend supplies to the catalog engine.
///
/// The adapter is the single writer of persisted state. It never checks
/// tree invariants; the engine validates against a snapshot first and only
/// then calls the write methods.
pub trait CatalogStore {
    /// Full scan of the category table
    fn read_all_categories(&self) -> StoreResult<Vec<Category>>;

    /// Full scan of the item table
    fn read_all_items(&self) -> StoreResult<Vec<Item>>;

    /// Insert a category row and return its newly assigned id
    fn create_category(&mut self, name: &str, parent_id: Option<CategoryId>)
        -> StoreResult<CategoryId>;

    /// Insert an item row with count 0 and no images
    fn create_item(
        &mut self,
        uid: &str,
        name: &str,
        category_id: Option<CategoryId>,
        timestamp: i64,
    ) -> StoreResult<()>;

    fn update_category_parent(
        &mut self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> StoreResult<()>;

    fn update_item_category(&mut self, uid: &str, category_id: Option<CategoryId>)
        -> StoreResult<()>;

    /// Write name, count and timestamp in one row update
    fn update_item_fields(&mut self, uid: &str, name: &str, count: i64, timestamp: i64)
        -> StoreResult<()>;

    /// Replace the image list and bump the timestamp in one row update
    fn update_item_images(&mut self, uid: &str, images: &[ImageRef], timestamp: i64)
        -> StoreResult<()>;

    fn delete_category_row(&mut self, id: CategoryId) -> StoreResult<()>;

    fn delete_item_row(&mut self, uid: &str) -> StoreResult<()>;

    /// Locate the row holding `key` (a category id or an item uid)
    fn find_row_index(&self, table: Table, key: &str) -> StoreResult<Option<RowHandle>>;
}
