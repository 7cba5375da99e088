//! Path → category resolution against a snapshot.

use super::index::Snapshot;
use super::path;
use crate::error::{CatalogError, CatalogResult};
use crate::state::data::CategoryId;

/// Walk `path` from the root, matching each segment against the children of
/// the current category without regard to case.
///
/// Returns `None` only for the root path. Sibling names are unique, so each
/// step has at most one match; if corrupt data ever holds two, the first in
/// backend scan order wins.
pub fn resolve(snapshot: &Snapshot, path: &str) -> CatalogResult<Option<CategoryId>> {
    let normalized = path::normalize(path)?;

    let mut current: Option<CategoryId> = None;
    for segment in path::segments(&normalized) {
        let child = snapshot
            .child_named(current, segment)
            .ok_or_else(|| CatalogError::PathNotFound {
                path: normalized.clone(),
            })?;
        current = Some(child.id);
    }

    Ok(current)
}
