//! Namespace resolution
//!
//! Stack-based scope tracking used while the tree is built. Bindings are
//! resolved to URIs at build time; the nearest declaration wins, so inner
//! declarations shadow outer ones.

use super::strings::{StringId, StringPool};

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
}

/// A binding together with the element depth where it was declared
#[derive(Debug, Clone, Copy)]
struct ScopedBinding {
    prefix_id: StringId,
    uri_id: StringId,
    depth: u16,
}

/// Stack-based namespace resolver used during parsing
#[derive(Debug)]
pub struct NamespaceScope {
    bindings: Vec<ScopedBinding>,
    depth: u16,
    xml_prefix_id: StringId,
}

impl NamespaceScope {
    /// Create a resolver with the `xml` prefix pre-bound per the XML
    /// namespaces recommendation
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xml_uri_id = strings.intern(ns::XML);

        NamespaceScope {
            bindings: vec![ScopedBinding {
                prefix_id: xml_prefix_id,
                uri_id: xml_uri_id,
                depth: 0,
            }],
            depth: 0,
            xml_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding in the current scope. The `xml` prefix cannot be
    /// rebound. Prefix 0 declares the default namespace.
    pub fn declare(&mut self, prefix_id: StringId, uri_id: StringId) {
        if prefix_id == self.xml_prefix_id {
            return;
        }
        self.bindings.push(ScopedBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to its URI id, nearest declaration first
    pub fn resolve(&self, prefix_id: StringId) -> Option<StringId> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace for the current scope
    pub fn resolve_default(&self) -> Option<StringId> {
        self.resolve(0)
    }
}

/// Split a qualified name into (prefix, local name)
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_prefix_prebound() {
        let mut strings = StringPool::new();
        let scope = NamespaceScope::new(&mut strings);
        let xml_id = strings.intern("xml");
        let uri = scope.resolve(xml_id).map(|id| strings.get(id).to_string());
        assert_eq!(uri.as_deref(), Some(ns::XML));
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut strings = StringPool::new();
        let mut scope = NamespaceScope::new(&mut strings);

        let svg = strings.intern("svg");
        let uri = strings.intern("http://www.w3.org/2000/svg");

        scope.push_scope();
        scope.declare(svg, uri);
        assert_eq!(scope.resolve(svg), Some(uri));
    }

    #[test]
    fn test_scope_pop_removes_binding() {
        let mut strings = StringPool::new();
        let mut scope = NamespaceScope::new(&mut strings);

        let prefix = strings.intern("foo");
        let uri = strings.intern("uri:foo");

        scope.push_scope();
        scope.declare(prefix, uri);
        assert_eq!(scope.resolve(prefix), Some(uri));

        scope.pop_scope();
        assert_eq!(scope.resolve(prefix), None);
    }

    #[test]
    fn test_shadowing() {
        let mut strings = StringPool::new();
        let mut scope = NamespaceScope::new(&mut strings);

        let prefix = strings.intern("p");
        let uri1 = strings.intern("uri:one");
        let uri2 = strings.intern("uri:two");

        scope.push_scope();
        scope.declare(prefix, uri1);
        scope.push_scope();
        scope.declare(prefix, uri2);
        assert_eq!(scope.resolve(prefix), Some(uri2));

        scope.pop_scope();
        assert_eq!(scope.resolve(prefix), Some(uri1));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
        assert_eq!(split_qname("rect"), (None, "rect"));
        assert_eq!(split_qname(":odd"), (None, ":odd"));
    }
}
