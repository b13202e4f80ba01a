//! XML node representation
//!
//! Uses NodeId (u32) indices into the document arena for compact,
//! cache-friendly node references. Parent links are plain indices, so the
//! parent-owns-children tree carries no ownership cycles.

use super::strings::StringId;

/// Compact node identifier (index into the document arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document node (arena index 0, parent of the root element)
    Document,
    /// Element node
    Element,
    /// Text content (including CDATA sections)
    Text,
    /// Comment
    Comment,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node (None only for the document node)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements) or content (text, comments)
    pub name_id: StringId,
    /// Local name without prefix (elements)
    pub local_id: StringId,
    /// Namespace prefix, or 0 when unprefixed
    pub prefix_id: StringId,
    /// Resolved namespace URI, or 0 when in no namespace
    pub namespace_id: StringId,
    /// Start of this element's attributes in the attribute arena
    pub attr_start: u32,
    pub attr_count: u16,
    /// Start of this element's namespace declarations in the bindings arena
    pub ns_start: u32,
    pub ns_count: u16,
    /// Byte offset of the node's markup in the source text
    pub position: u32,
}

impl XmlNode {
    fn blank(kind: NodeKind, parent: Option<NodeId>, position: u32) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            attr_start: 0,
            attr_count: 0,
            ns_start: 0,
            ns_count: 0,
            position,
        }
    }

    /// Create the document node
    pub fn document() -> Self {
        Self::blank(NodeKind::Document, None, 0)
    }

    /// Create an element node
    pub fn element(name_id: StringId, parent: NodeId, position: u32) -> Self {
        let mut node = Self::blank(NodeKind::Element, Some(parent), position);
        node.name_id = name_id;
        node
    }

    /// Create a text node; `content_id` points at the interned content
    pub fn text(content_id: StringId, parent: NodeId, position: u32) -> Self {
        let mut node = Self::blank(NodeKind::Text, Some(parent), position);
        node.name_id = content_id;
        node
    }

    /// Create a comment node
    pub fn comment(content_id: StringId, parent: NodeId, position: u32) -> Self {
        let mut node = Self::blank(NodeKind::Comment, Some(parent), position);
        node.name_id = content_id;
        node
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }
}

/// Stored attribute, owned by its element
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// Qualified name as written in the source
    pub name_id: StringId,
    /// Local name without prefix
    pub local_id: StringId,
    /// Namespace prefix, or 0 when unprefixed
    pub prefix_id: StringId,
    /// Resolved namespace URI, or 0 when in no namespace
    pub namespace_id: StringId,
    pub value_id: StringId,
}

/// A prefix -> URI binding declared on an element, in scope for that
/// element and its descendants unless shadowed. Prefix 0 is the default
/// namespace.
#[derive(Debug, Clone, Copy)]
pub struct NsDecl {
    pub prefix_id: StringId,
    pub uri_id: StringId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_node() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, 0, 7);
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert_eq!(elem.position, 7);
        assert_eq!(elem.attr_count, 0);
    }
}
