//! Shared data structures for the catalog state
//!
//! These structs represent the data model that flows between
//! the storage adapters and the tree engine.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Backend-assigned category identifier
pub type CategoryId = i64;

/// Maximum number of images attached to a single item
pub const MAX_IMAGES: usize = 3;

/// A folder-like node that holds sub-categories and items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique backend ID
    pub id: CategoryId,
    /// Display name, unique among siblings (case-insensitive)
    pub name: String,
    /// Parent category, None for root-level categories
    pub parent_id: Option<CategoryId>,
}

/// A leaf inventory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// 10-digit numeric identifier, never reused
    pub uid: String,
    pub name: String,
    pub count: i64,
    /// Last modification, epoch seconds
    pub timestamp: i64,
    /// Owning category, None for root-level items
    pub category_id: Option<CategoryId>,
    /// Up to three attached images
    pub images: Vec<ImageRef>,
}

/// One stored image of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Locator of the resized thumbnail
    pub thumb: String,
    /// Locator of the full-resolution file
    pub full: String,
    /// Backend-specific external storage handle (e.g. a hosted blob id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl ImageRef {
    /// Decode the JSON text stored in the `image_paths` column.
    /// An empty cell is an empty list.
    pub fn list_from_json(json: &str) -> Result<Vec<ImageRef>, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(json)
    }

    /// Encode an image list for the `image_paths` column
    pub fn list_to_json(images: &[ImageRef]) -> Result<String, serde_json::Error> {
        serde_json::to_string(images)
    }
}

/// The two kinds of tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Category,
    Item,
}

/// A reference to one existing node by identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Category(CategoryId),
    Item(String),
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Category(id) => write!(f, "category #{}", id),
            NodeRef::Item(uid) => write!(f, "item {}", uid),
        }
    }
}

/// Where a new node should be placed: the root, a known category id,
/// or an absolute path that still has to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Root,
    Id(CategoryId),
    Path(String),
}

impl From<Option<CategoryId>> for Location {
    fn from(id: Option<CategoryId>) -> Self {
        match id {
            Some(id) => Location::Id(id),
            None => Location::Root,
        }
    }
}
