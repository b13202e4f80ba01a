//! xmlpath: a self-contained XML document model with a restricted
//! path-query language.
//!
//! The crate parses an XML document into an arena-backed tree and answers
//! queries written in a small `/`-separated path grammar: child steps,
//! `//` descendant steps, `*` wildcards, `@name` attribute steps, and
//! `[n]` / `[@name='value']` predicates, with namespace prefixes resolved
//! through caller-supplied bindings.
//!
//! ```
//! use xmlpath::{Document, Namespaces};
//!
//! let doc = Document::parse(r#"<a><b x="1"/><b x="2"/></a>"#)?;
//! let hits = doc.query("/a/b[2]/@x", &Namespaces::new())?;
//! assert_eq!(hits.first().map(|item| item.value()), Some("2".to_string()));
//! # Ok::<(), xmlpath::Error>(())
//! ```
//!
//! Parsing and compilation report errors; evaluation never does. A path
//! that matches nothing yields an empty result set.

pub mod core;
pub mod dom;
pub mod error;
pub mod path;

pub use dom::{Document, NodeId, NodeKind, ParseOptions};
pub use error::{Error, Result};
pub use path::{CompiledPath, Item, NodeSet, Namespaces, PathCache};
