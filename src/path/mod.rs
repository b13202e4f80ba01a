//! Path expression support: compilation, evaluation, results, and caching

pub mod cache;
pub mod compiler;
pub mod eval;
pub mod nodeset;

pub use cache::PathCache;
pub use compiler::{Axis, CompiledPath, Namespaces, DEFAULT_PREFIX};
pub use nodeset::{Item, ItemRef, Iter, NodeSet};
