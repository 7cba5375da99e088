use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::data::{Category, CategoryId, ImageRef, Item};
use super::{CatalogStore, RowHandle, Table};
use crate::error::{StoreError, StoreResult};

/// The Library manages the SQLite catalog database.
/// It stores the category tree and the items filed under it.
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open (or create) the catalog database at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        info!("📁 Database opened at: {}", db_path.display());

        let library = Library {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        library.init_schema()?;

        Ok(library)
    }

    /// A throwaway database, used by tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates both tables and their lookup indexes if they don't exist.
    fn init_schema(&self) -> StoreResult<()> {
        // parent_id is NULL for root-level categories
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS category (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                parent_id       INTEGER REFERENCES category(id)
            )",
            [],
        )?;

        // image_paths holds the image list as JSON text
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS item (
                uid             TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                count           INTEGER NOT NULL DEFAULT 0,
                timestamp       INTEGER NOT NULL,
                category_id     INTEGER REFERENCES category(id),
                image_paths     TEXT NOT NULL DEFAULT '[]'
            )",
            [],
        )?;

        // Add image_paths column if it doesn't exist (databases created before images)
        // If the column exists, the ALTER fails and is ignored
        let _ = self.conn.execute(
            "ALTER TABLE item ADD COLUMN image_paths TEXT NOT NULL DEFAULT '[]'",
            [],
        );

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_category_parent_id ON category(parent_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_item_category_id ON item(category_id)",
            [],
        )?;

        debug!("✅ Database schema initialized");

        Ok(())
    }

    /// Get the path to the database file (None for in-memory databases)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Number of (categories, items) currently stored
    pub fn counts(&self) -> StoreResult<(i64, i64)> {
        let categories: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))?;
        let items: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM item", [], |row| row.get(0))?;
        Ok((categories, items))
    }

    /// Fail with MissingRow when an UPDATE/DELETE touched nothing
    fn expect_row(changed: usize, table: Table, key: impl ToString) -> StoreResult<()> {
        if changed == 0 {
            return Err(StoreError::MissingRow {
                table: table.name(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

/// Legacy rows store root-level references as 0 instead of NULL
fn parent_ref(raw: Option<i64>) -> Option<CategoryId> {
    raw.filter(|id| *id != 0)
}

impl CatalogStore for Library {
    fn read_all_categories(&self) -> StoreResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, COALESCE(name, ''), parent_id FROM category ORDER BY id")?;

        let category_iter = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: parent_ref(row.get(2)?),
            })
        })?;

        let mut categories = Vec::new();
        for category in category_iter {
            categories.push(category?);
        }

        Ok(categories)
    }

    fn read_all_items(&self) -> StoreResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, COALESCE(name, ''), COALESCE(count, 0), COALESCE(timestamp, 0),
                    category_id, COALESCE(image_paths, '[]')
             FROM item ORDER BY rowid",
        )?;

        let rows: Vec<(String, String, i64, i64, Option<i64>, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

        let mut items = Vec::with_capacity(rows.len());
        for (index, (uid, name, count, timestamp, category_id, image_paths)) in
            rows.into_iter().enumerate()
        {
            let images =
                ImageRef::list_from_json(&image_paths).map_err(|e| StoreError::Corrupt {
                    table: Table::Item.name(),
                    row: index + 1,
                    reason: format!("image_paths: {}", e),
                })?;
            items.push(Item {
                uid,
                name,
                count,
                timestamp,
                category_id: parent_ref(category_id),
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
        self.conn.execute(
            "INSERT INTO category (name, parent_id) VALUES (?1, ?2)",
            params![name, parent_id],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("📂 Inserted category #{} {:?}", id, name);
        Ok(id)
    }

    fn create_item(
        &mut self,
        uid: &str,
        name: &str,
        category_id: Option<CategoryId>,
        timestamp: i64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO item (uid, name, count, timestamp, category_id, image_paths)
             VALUES (?1, ?2, 0, ?3, ?4, '[]')",
            params![uid, name, timestamp, category_id],
        )?;
        debug!("📄 Inserted item {} {:?}", uid, name);
        Ok(())
    }

    fn update_category_parent(
        &mut self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE category SET parent_id = ?1 WHERE id = ?2",
            params![parent_id, id],
        )?;
        Self::expect_row(changed, Table::Category, id)
    }

    fn update_item_category(
        &mut self,
        uid: &str,
        category_id: Option<CategoryId>,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE item SET category_id = ?1 WHERE uid = ?2",
            params![category_id, uid],
        )?;
        Self::expect_row(changed, Table::Item, uid)
    }

    fn update_item_fields(
        &mut self,
        uid: &str,
        name: &str,
        count: i64,
        timestamp: i64,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE item SET name = ?1, count = ?2, timestamp = ?3 WHERE uid = ?4",
            params![name, count, timestamp, uid],
        )?;
        Self::expect_row(changed, Table::Item, uid)
    }

    fn update_item_images(
        &mut self,
        uid: &str,
        images: &[ImageRef],
        timestamp: i64,
    ) -> StoreResult<()> {
        let json = ImageRef::list_to_json(images)?;
        let changed = self.conn.execute(
            "UPDATE item SET image_paths = ?1, timestamp = ?2 WHERE uid = ?3",
            params![json, timestamp, uid],
        )?;
        Self::expect_row(changed, Table::Item, uid)
    }

    fn delete_category_row(&mut self, id: CategoryId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM category WHERE id = ?1", params![id])?;
        Self::expect_row(changed, Table::Category, id)
    }

    fn delete_item_row(&mut self, uid: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM item WHERE uid = ?1", params![uid])?;
        Self::expect_row(changed, Table::Item, uid)
    }

    fn find_row_index(&self, table: Table, key: &str) -> StoreResult<Option<RowHandle>> {
        let rowid = match table {
            Table::Category => {
                let Ok(id) = key.trim().parse::<i64>() else {
                    return Ok(None);
                };
                self.conn
                    .query_row(
                        "SELECT rowid FROM category WHERE id = ?1",
                        params![id],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?
            }
            Table::Item => self
                .conn
                .query_row("SELECT rowid FROM item WHERE uid = ?1", params![key], |row| {
                    row.get::<_, i64>(0)
                })
                .optional()?,
        };
        Ok(rowid.map(RowHandle))
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
