//! DOM module - arena-based XML document
//!
//! - Arena allocation for nodes, NodeId (u32) indices
//! - String interning for names, URIs and content
//! - Namespace resolution at tree-build time

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;

pub use document::{ChildIter, DescendantIter, Document, ParseOptions};
pub use node::{NodeId, NodeKind, NsDecl, XmlAttribute, XmlNode};
pub use strings::{StringId, StringPool};
