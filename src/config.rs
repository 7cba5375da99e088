//! Runtime configuration
//!
//! Which backend to open and where its files live. Defaults put both files
//! in the user's data directory; the CLI overrides each field.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::state::sheet::DEFAULT_COMPACT_THRESHOLD;

/// Folder under the data directory holding the catalog files
pub const APP_DIR: &str = "stock-catalog";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Relational tables in a SQLite file
    #[default]
    Sqlite,
    /// Header-plus-rows sheets in a JSON workbook
    Sheet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    pub database: PathBuf,
    pub workbook: PathBuf,
    /// Blank sheet rows tolerated before the sheet is compacted
    pub compact_threshold: usize,
}

impl Config {
    /// `<data_dir>/stock-catalog`, falling back to the home directory
    pub fn data_dir() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    /// Location of the file the configured backend reads and writes
    pub fn store_path(&self) -> &PathBuf {
        match self.backend {
            Backend::Sqlite => &self.database,
            Backend::Sheet => &self.workbook,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let dir = Self::data_dir();
        Config {
            backend: Backend::default(),
            database: dir.join("stock.db"),
            workbook: dir.join("stock.workbook.json"),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}
