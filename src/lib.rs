//! Hierarchical stock catalog: categories nested by parent id, items filed
//! under them, addressed by slash paths and stored either in SQLite or in a
//! spreadsheet-style workbook.

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod tree;

pub use config::{Backend, Config};
pub use engine::{response::Response, Catalog};
pub use error::{CatalogError, CatalogResult, ErrorKind, StoreError};
pub use state::CatalogStore;
