/// Tree module
///
/// Read-side view of the category tree:
/// - Path codec, normalizing and splitting slash paths (path.rs)
/// - Per-operation snapshot with lookup indexes (index.rs)
/// - Path resolution against a snapshot (resolver.rs)

pub mod index;
pub mod path;
pub mod resolver;

pub use index::Snapshot;
pub use resolver::resolve;
