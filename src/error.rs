//! Error types for the catalog engine and its storage adapters.

use serde::Serialize;
use thiserror::Error;

use crate::state::data::CategoryId;

/// Faults raised by a storage backend. None of these are retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("workbook I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt {table} row {row}: {reason}")]
    Corrupt {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error("{table} row for key {key} not found")]
    MissingRow { table: &'static str, key: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything a catalog operation can fail with
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid name {0:?}: use letters, digits, spaces and _ , . -")]
    InvalidName(String),

    #[error("invalid path {0:?}: must be absolute (start with '/')")]
    InvalidPath(String),

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("{name:?} already exists in {parent}")]
    DuplicateName { name: String, parent: String },

    #[error("cannot move a category into itself or one of its descendants")]
    Cycle,

    #[error("cannot delete category: it contains items")]
    NotEmpty,

    #[error("{0} not found")]
    NotFound(String),

    #[error("parent chain of category #{0} loops back on itself")]
    CycleDetected(CategoryId),

    #[error("an item holds at most {0} images")]
    TooManyImages(usize),

    #[error("item has no image at index {0}")]
    ImageIndex(usize),

    #[error("could not draw an unused item identifier")]
    UidSpaceExhausted,

    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Stable machine-readable error identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidName,
    InvalidPath,
    PathNotFound,
    DuplicateName,
    Cycle,
    NotEmpty,
    NotFound,
    CorruptTree,
    TooManyImages,
    InvalidImageIndex,
    UidSpaceExhausted,
    StorageUnavailable,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidName(_) => ErrorKind::InvalidName,
            CatalogError::InvalidPath(_) => ErrorKind::InvalidPath,
            CatalogError::PathNotFound { .. } => ErrorKind::PathNotFound,
            CatalogError::DuplicateName { .. } => ErrorKind::DuplicateName,
            CatalogError::Cycle => ErrorKind::Cycle,
            CatalogError::NotEmpty => ErrorKind::NotEmpty,
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::CycleDetected(_) => ErrorKind::CorruptTree,
            CatalogError::TooManyImages(_) => ErrorKind::TooManyImages,
            CatalogError::ImageIndex(_) => ErrorKind::InvalidImageIndex,
            CatalogError::UidSpaceExhausted => ErrorKind::UidSpaceExhausted,
            CatalogError::Storage(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// True when the backend itself failed, as opposed to a rejected request
    pub fn is_storage(&self) -> bool {
        matches!(self, CatalogError::Storage(_))
    }
}
