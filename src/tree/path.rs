//! Conversion between absolute slash paths and segment lists.

use crate::error::{CatalogError, CatalogResult};

pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";

/// Normalize an absolute path.
///
/// Repeated separators collapse, `.` segments vanish, `..` pops one segment
/// (and stops at the root). The result always starts with `/` and never ends
/// with one unless it is the root itself. Segments are trimmed because stored
/// names never carry surrounding whitespace.
pub fn normalize(path: &str) -> CatalogResult<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() || !trimmed.starts_with(SEPARATOR) {
        return Err(CatalogError::InvalidPath(path.to_string()));
    }

    let mut stack: Vec<&str> = Vec::new();
    for segment in trimmed.split(SEPARATOR).map(str::trim) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }

    Ok(join(stack))
}

/// Split a normalized path into its component names. Root yields nothing.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build a path from a root-to-leaf name sequence
pub fn join<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = String::new();
    for name in names {
        path.push(SEPARATOR);
        path.push_str(name.as_ref());
    }
    if path.is_empty() {
        path.push(SEPARATOR);
    }
    path
}
