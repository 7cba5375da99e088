//! A spreadsheet used as a row-oriented database
//!
//! Each sheet is a grid of string cells whose first row is the header.
//! Rows are addressed 1-based like a spreadsheet UI, so the first data row
//! is row 2. A row whose cells are all empty counts as deleted.
//!
//! The workbook lives in a single JSON document on disk. Every read goes to
//! the file and every write is a read-modify-write of the whole document,
//! replaced atomically through a temporary file. Nothing is cached between
//! calls, so another writer's changes are always picked up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Row number of the header in every sheet
pub const HEADER_ROW: usize = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    sheets: BTreeMap<String, Vec<Vec<String>>>,
}

impl Document {
    fn sheet_mut(&mut self, sheet: &'static str) -> StoreResult<&mut Vec<Vec<String>>> {
        self.sheets.get_mut(sheet).ok_or(StoreError::MissingRow {
            table: sheet,
            key: "header".into(),
        })
    }
}

pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

pub struct Workbook {
    path: PathBuf,
}

impl Workbook {
    /// Open the workbook at `path`, creating an empty one if the file is missing
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let workbook = Workbook { path };
        if !workbook.path.exists() {
            workbook.save(&Document::default())?;
            info!("📒 Created workbook at: {}", workbook.path.display());
        } else {
            info!("📒 Workbook opened at: {}", workbook.path.display());
        }

        Ok(workbook)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<Document> {
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Document::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Create `sheet` with `header` if it is missing or has no header row
    pub fn ensure_sheet(&mut self, sheet: &'static str, header: &[&str]) -> StoreResult<()> {
        let mut doc = self.load()?;
        let rows = doc.sheets.entry(sheet.to_string()).or_default();
        if rows.is_empty() {
            rows.push(header.iter().map(|h| h.to_string()).collect());
            self.save(&doc)?;
            debug!("📒 Added sheet {:?}", sheet);
        }
        Ok(())
    }

    /// Every row of `sheet`, header included
    pub fn values(&self, sheet: &'static str) -> StoreResult<Vec<Vec<String>>> {
        let mut doc = self.load()?;
        Ok(doc.sheets.remove(sheet).unwrap_or_default())
    }

    /// Append a row, returning its 1-based row number
    pub fn append_row(&mut self, sheet: &'static str, values: Vec<String>) -> StoreResult<usize> {
        let mut doc = self.load()?;
        let rows = doc.sheet_mut(sheet)?;
        rows.push(values);
        let row = rows.len();
        self.save(&doc)?;
        Ok(row)
    }

    /// Overwrite individual cells of one row, each addressed by 1-based column.
    ///
    /// The row is re-read first and must still carry `key` in its first cell;
    /// cells not named in `updates` are left untouched.
    pub fn update_cells(
        &mut self,
        sheet: &'static str,
        row: usize,
        key: &str,
        updates: &[(usize, String)],
    ) -> StoreResult<()> {
        let mut doc = self.load()?;
        let cells = Self::keyed_row(doc.sheet_mut(sheet)?, sheet, row, key)?;

        for (col, value) in updates {
            let index = col.saturating_sub(1);
            if cells.len() <= index {
                cells.resize(index + 1, String::new());
            }
            cells[index] = value.clone();
        }

        self.save(&doc)
    }

    /// Blank every cell of one row (the spreadsheet notion of deleting it)
    pub fn clear_row(&mut self, sheet: &'static str, row: usize, key: &str) -> StoreResult<()> {
        let mut doc = self.load()?;
        let cells = Self::keyed_row(doc.sheet_mut(sheet)?, sheet, row, key)?;
        cells.iter_mut().for_each(String::clear);
        self.save(&doc)
    }

    /// Number of blank data rows in `sheet`
    pub fn blank_rows(&self, sheet: &'static str) -> StoreResult<usize> {
        Ok(self
            .values(sheet)?
            .iter()
            .skip(HEADER_ROW)
            .filter(|row| is_blank(row))
            .count())
    }

    /// Drop blank data rows, returning how many were removed.
    /// Row numbers of the remaining rows shift up.
    pub fn compact(&mut self, sheet: &'static str) -> StoreResult<usize> {
        let mut doc = self.load()?;
        let rows = doc.sheet_mut(sheet)?;
        let before = rows.len();
        let mut index = 0;
        rows.retain(|row| {
            index += 1;
            index <= HEADER_ROW || !is_blank(row)
        });
        let removed = before - rows.len();
        if removed > 0 {
            self.save(&doc)?;
            info!("🧹 Compacted {} blank rows from sheet {:?}", removed, sheet);
        }
        Ok(removed)
    }

    fn keyed_row<'a>(
        rows: &'a mut [Vec<String>],
        sheet: &'static str,
        row: usize,
        key: &str,
    ) -> StoreResult<&'a mut Vec<String>> {
        let missing = || StoreError::MissingRow {
            table: sheet,
            key: key.to_string(),
        };
        if row <= HEADER_ROW {
            return Err(missing());
        }
        let cells = rows.get_mut(row - 1).ok_or_else(missing)?;
        if cells.first().map(|cell| cell.trim()) != Some(key) {
            return Err(missing());
        }
        Ok(cells)
    }
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook").field("path", &self.path).finish()
    }
}
