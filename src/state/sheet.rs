use std::path::Path;
use tracing::{debug, warn};

use super::data::{Category, CategoryId, ImageRef, Item};
use super::workbook::{is_blank, Workbook, HEADER_ROW};
use super::{CatalogStore, RowHandle, Table};
use crate::error::{StoreError, StoreResult};

pub const CATEGORY_SHEET: &str = "category";
pub const ITEM_SHEET: &str = "item";

const CATEGORY_HEADER: [&str; 3] = ["id", "name", "parent_id"];
const ITEM_HEADER: [&str; 6] = ["uid", "name", "count", "timestamp", "category_id", "image_paths"];

// 1-based sheet columns
const CATEGORY_PARENT_COL: usize = 3;
const ITEM_NAME_COL: usize = 2;
const ITEM_COUNT_COL: usize = 3;
const ITEM_TIMESTAMP_COL: usize = 4;
const ITEM_CATEGORY_COL: usize = 5;
const ITEM_IMAGES_COL: usize = 6;

/// Default number of blank rows a sheet may hold before it is compacted
pub const DEFAULT_COMPACT_THRESHOLD: usize = 16;

/// Catalog storage on top of a spreadsheet workbook.
///
/// Category ids are assigned as max-existing-id + 1. Deleting a row blanks
/// it; blank rows are skipped on read and swept out once a sheet holds
/// `compact_threshold` of them.
pub struct SheetStore {
    workbook: Workbook,
    compact_threshold: usize,
}

impl SheetStore {
    pub fn open(path: &Path, compact_threshold: usize) -> StoreResult<Self> {
        let mut workbook = Workbook::open(path)?;
        workbook.ensure_sheet(CATEGORY_SHEET, &CATEGORY_HEADER)?;
        workbook.ensure_sheet(ITEM_SHEET, &ITEM_HEADER)?;

        Ok(SheetStore {
            workbook,
            compact_threshold: compact_threshold.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        self.workbook.path()
    }

    /// Remove every blank row from both sheets
    pub fn compact(&mut self) -> StoreResult<usize> {
        let categories = self.workbook.compact(CATEGORY_SHEET)?;
        let items = self.workbook.compact(ITEM_SHEET)?;
        Ok(categories + items)
    }

    fn maybe_compact(&mut self, sheet: &'static str) -> StoreResult<()> {
        let blank = self.workbook.blank_rows(sheet)?;
        if blank >= self.compact_threshold {
            debug!("{} blank rows in sheet {:?}, compacting", blank, sheet);
            self.workbook.compact(sheet)?;
        }
        Ok(())
    }

    fn sheet_for(table: Table) -> &'static str {
        match table {
            Table::Category => CATEGORY_SHEET,
            Table::Item => ITEM_SHEET,
        }
    }

    /// Row number holding `key`, or MissingRow
    fn locate(&self, table: Table, key: &str) -> StoreResult<usize> {
        match self.find_row_index(table, key)? {
            Some(RowHandle(row)) => Ok(row as usize),
            None => Err(StoreError::MissingRow {
                table: table.name(),
                key: key.to_string(),
            }),
        }
    }
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col - 1).map(|c| c.trim()).unwrap_or("")
}

fn corrupt(table: Table, row: usize, reason: String) -> StoreError {
    StoreError::Corrupt {
        table: table.name(),
        row,
        reason,
    }
}

fn parse_int(table: Table, row: usize, field: &str, value: &str) -> StoreResult<i64> {
    value
        .parse::<i64>()
        .map_err(|_| corrupt(table, row, format!("{} {:?} is not an integer", field, value)))
}

/// Empty and zero references both mean root
fn parse_ref(table: Table, row: usize, field: &str, value: &str) -> StoreResult<Option<CategoryId>> {
    if value.is_empty() {
        return Ok(None);
    }
    let id = parse_int(table, row, field, value)?;
    Ok((id != 0).then_some(id))
}

fn ref_cell(id: Option<CategoryId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

/// Data rows of a sheet with their 1-based row numbers, blanks skipped
fn data_rows(values: &[Vec<String>]) -> impl Iterator<Item = (usize, &Vec<String>)> {
    values
        .iter()
        .enumerate()
        .skip(HEADER_ROW)
        .map(|(index, row)| (index + 1, row))
        .filter(|(_, row)| !is_blank(row))
}

impl CatalogStore for SheetStore {
    fn read_all_categories(&self) -> StoreResult<Vec<Category>> {
        let values = self.workbook.values(CATEGORY_SHEET)?;
        let mut categories = Vec::new();
        for (row, cells) in data_rows(&values) {
            categories.push(Category {
                id: parse_int(Table::Category, row, "id", cell(cells, 1))?,
                name: cell(cells, 2).to_string(),
                parent_id: parse_ref(Table::Category, row, "parent_id", cell(cells, 3))?,
            });
        }
        Ok(categories)
    }

    fn read_all_items(&self) -> StoreResult<Vec<Item>> {
        let values = self.workbook.values(ITEM_SHEET)?;
        let mut items = Vec::new();
        for (row, cells) in data_rows(&values) {
            let count = match cell(cells, ITEM_COUNT_COL) {
                "" => 0,
                raw => parse_int(Table::Item, row, "count", raw)?,
            };
            let timestamp = match cell(cells, ITEM_TIMESTAMP_COL) {
                "" => 0,
                raw => parse_int(Table::Item, row, "timestamp", raw)?,
            };
            let images = ImageRef::list_from_json(cell(cells, ITEM_IMAGES_COL))
                .map_err(|e| corrupt(Table::Item, row, format!("image_paths: {}", e)))?;

            items.push(Item {
                uid: cell(cells, 1).to_string(),
                name: cell(cells, ITEM_NAME_COL).to_string(),
                count,
                timestamp,
                category_id: parse_ref(Table::Item, row, "category_id", cell(cells, ITEM_CATEGORY_COL))?,
                images,
            });
        }
        Ok(items)
    }

    fn create_category(
        &mut self,
        name: &str,
        parent_id: Option<CategoryId>,
    ) -> StoreResult<CategoryId> {
        let id = self
            .read_all_categories()?
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap_or(0)
            + 1;

        let row = self.workbook.append_row(
            CATEGORY_SHEET,
            vec![id.to_string(), name.to_string(), ref_cell(parent_id)],
        )?;
        debug!("📂 Appended category #{} {:?} at row {}", id, name, row);
        Ok(id)
    }

    fn create_item(
        &mut self,
        uid: &str,
        name: &str,
        category_id: Option<CategoryId>,
        timestamp: i64,
    ) -> StoreResult<()> {
        let row = self.workbook.append_row(
            ITEM_SHEET,
            vec![
                uid.to_string(),
                name.to_string(),
                "0".to_string(),
                timestamp.to_string(),
                ref_cell(category_id),
                "[]".to_string(),
            ],
        )?;
        debug!("📄 Appended item {} {:?} at row {}", uid, name, row);
        Ok(())
    }

    fn update_category_parent(
        &mut self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> StoreResult<()> {
        let key = id.to_string();
        let row = self.locate(Table::Category, &key)?;
        self.workbook.update_cells(
            CATEGORY_SHEET,
            row,
            &key,
            &[(CATEGORY_PARENT_COL, ref_cell(parent_id))],
        )
    }

    fn update_item_category(
        &mut self,
        uid: &str,
        category_id: Option<CategoryId>,
    ) -> StoreResult<()> {
        let row = self.locate(Table::Item, uid)?;
        self.workbook.update_cells(
            ITEM_SHEET,
            row,
            uid,
            &[(ITEM_CATEGORY_COL, ref_cell(category_id))],
        )
    }

    fn update_item_fields(
        &mut self,
        uid: &str,
        name: &str,
        count: i64,
        timestamp: i64,
    ) -> StoreResult<()> {
        let row = self.locate(Table::Item, uid)?;
        self.workbook.update_cells(
            ITEM_SHEET,
            row,
            uid,
            &[
                (ITEM_NAME_COL, name.to_string()),
                (ITEM_COUNT_COL, count.to_string()),
                (ITEM_TIMESTAMP_COL, timestamp.to_string()),
            ],
        )
    }

    fn update_item_images(
        &mut self,
        uid: &str,
        images: &[ImageRef],
        timestamp: i64,
    ) -> StoreResult<()> {
        let row = self.locate(Table::Item, uid)?;
        let json = ImageRef::list_to_json(images)?;
        self.workbook.update_cells(
            ITEM_SHEET,
            row,
            uid,
            &[
                (ITEM_TIMESTAMP_COL, timestamp.to_string()),
                (ITEM_IMAGES_COL, json),
            ],
        )
    }

    fn delete_category_row(&mut self, id: CategoryId) -> StoreResult<()> {
        let key = id.to_string();
        let row = self.locate(Table::Category, &key)?;
        self.workbook.clear_row(CATEGORY_SHEET, row, &key)?;
        self.maybe_compact(CATEGORY_SHEET)
    }

    fn delete_item_row(&mut self, uid: &str) -> StoreResult<()> {
        let row = self.locate(Table::Item, uid)?;
        self.workbook.clear_row(ITEM_SHEET, row, uid)?;
        self.maybe_compact(ITEM_SHEET)
    }

    fn find_row_index(&self, table: Table, key: &str) -> StoreResult<Option<RowHandle>> {
        let key = key.trim();
        let values = self.workbook.values(Self::sheet_for(table))?;
        let mut found = data_rows(&values).filter(|(_, cells)| cell(cells, 1) == key);

        let hit = found.next().map(|(row, _)| RowHandle(row as i64));
        if hit.is_some() && found.next().is_some() {
            warn!("⚠️  Key {} appears on more than one {} row, using the first", key, table.name());
        }
        Ok(hit)
    }
}

impl std::fmt::Debug for SheetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetStore")
            .field("workbook", &self.workbook)
            .field("compact_threshold", &self.compact_threshold)
            .finish()
    }
}
