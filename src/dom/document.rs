//! XML document - arena-based DOM representation
//!
//! The tree builder consumes the full token stream and produces a fully
//! built `Document`, or the first structural error. Construction is
//! all-or-nothing: no partial document is ever returned. Once built, a
//! document is immutable and safe to query concurrently.

use super::namespace::{split_qname, NamespaceScope};
use super::node::{NodeId, NodeKind, NsDecl, XmlAttribute, XmlNode};
use super::strings::{StringId, StringPool};
use crate::core::tokenizer::{Token, TokenKind, Tokenizer};
use crate::error::{Error, Result};
use log::debug;

/// Tree-building policy knobs.
///
/// Whitespace-only text between tags survives tokenization; whether it
/// becomes a text node is decided here, explicitly.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes inside elements (default true)
    pub keep_whitespace_text: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            keep_whitespace_text: true,
        }
    }
}

/// An immutable XML document stored in arena format
#[derive(Debug)]
pub struct Document {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    ns_decls: Vec<NsDecl>,
    strings: StringPool,
    root_element: Option<NodeId>,
}

/// An element mid-construction: its open tag has been seen but its
/// attributes may still be arriving.
struct PendingElement<'a> {
    name: &'a str,
    position: usize,
    attrs: Vec<(&'a str, std::borrow::Cow<'a, str>, usize)>,
}

impl Document {
    /// Parse an XML document with default options
    pub fn parse(text: &str) -> Result<Document> {
        Self::parse_with_options(text, ParseOptions::default())
    }

    /// Parse an XML document.
    ///
    /// Whitespace-only input yields a document with no root element, which
    /// is a valid state (queries against it match nothing).
    pub fn parse_with_options(text: &str, options: ParseOptions) -> Result<Document> {
        let mut doc = Document {
            nodes: Vec::with_capacity(64),
            attributes: Vec::with_capacity(32),
            ns_decls: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
        };
        doc.nodes.push(XmlNode::document());

        let mut builder = TreeBuilder {
            doc: &mut doc,
            scope_stack: vec![0],
            pending: None,
            options,
        };
        builder.run(Tokenizer::new(text))?;

        debug!(
            "parsed document: {} nodes, {} attributes, root {:?}",
            doc.nodes.len(),
            doc.attributes.len(),
            doc.root_element.map(|id| doc.name(id))
        );
        Ok(doc)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Root element id, if the document has one
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by id
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id as usize]
    }

    /// Qualified name of an element, or content of a text/comment node
    pub fn name(&self, id: NodeId) -> &str {
        self.strings.get(self.node(id).name_id)
    }

    /// Local name of an element (without prefix)
    pub fn local_name(&self, id: NodeId) -> &str {
        self.strings.get(self.node(id).local_id)
    }

    /// Namespace prefix of an element, if any
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        match self.node(id).prefix_id {
            0 => None,
            pid => Some(self.strings.get(pid)),
        }
    }

    /// Resolved namespace URI of an element, if it is in a namespace
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        match self.node(id).namespace_id {
            0 => None,
            nid => Some(self.strings.get(nid)),
        }
    }

    /// Content of a text or comment node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text | NodeKind::Comment => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    /// Attributes of an element, in source order
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        let node = self.node(id);
        let start = node.attr_start as usize;
        &self.attributes[start..start + node.attr_count as usize]
    }

    /// Attribute value by qualified name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| self.strings.get(a.name_id) == name)
            .map(|a| self.strings.get(a.value_id))
    }

    /// Namespace declarations made on an element
    pub fn ns_declarations(&self, id: NodeId) -> &[NsDecl] {
        let node = self.node(id);
        let start = node.ns_start as usize;
        &self.ns_decls[start..start + node.ns_count as usize]
    }

    /// Resolve a namespace prefix against an element's enclosing scope.
    ///
    /// Walks from `scope` upward through its ancestors and returns the
    /// nearest binding. The empty prefix resolves the default namespace.
    /// Returns None when the prefix is never bound.
    pub fn resolve_prefix(&self, prefix: &str, scope: NodeId) -> Option<&str> {
        if prefix == "xml" {
            return Some(super::namespace::ns::XML);
        }
        let mut current = Some(scope);
        while let Some(id) = current {
            for decl in self.ns_declarations(id).iter().rev() {
                if self.strings.get(decl.prefix_id) == prefix {
                    return Some(self.strings.get(decl.uri_id));
                }
            }
            current = self.node(id).parent;
        }
        None
    }

    /// Parent of a node (None for the document node)
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Iterate over direct children of a node, in insertion order
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Iterate over all descendants of a node, depth-first in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        self.push_children_reversed(id, &mut stack);
        DescendantIter { doc: self, stack }
    }

    fn push_children_reversed(&self, id: NodeId, stack: &mut Vec<NodeId>) {
        let mut child = self.node(id).last_child;
        while let Some(cid) = child {
            stack.push(cid);
            child = self.node(cid).prev_sibling;
        }
    }

    /// String value of a node: concatenated descendant text for elements,
    /// content for text and comment nodes
    pub fn string_value(&self, id: NodeId) -> String {
        match self.node(id).kind {
            NodeKind::Text | NodeKind::Comment => self.strings.get(self.node(id).name_id).into(),
            _ => {
                let mut out = String::new();
                for desc in self.descendants(id) {
                    if self.node(desc).kind == NodeKind::Text {
                        out.push_str(self.strings.get(self.node(desc).name_id));
                    }
                }
                out
            }
        }
    }

    pub(crate) fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub(crate) fn attribute_at(&self, id: NodeId, index: u32) -> &XmlAttribute {
        &self.attributes[self.node(id).attr_start as usize + index as usize]
    }
}

/// Iterator over direct children
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over descendants, depth-first
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.doc.push_children_reversed(current, &mut self.stack);
        Some(current)
    }
}

// ----------------------------------------------------------------------
// Tree builder
// ----------------------------------------------------------------------

struct TreeBuilder<'d, 'a> {
    doc: &'d mut Document,
    /// Stack of open elements; index 0 is the document node
    scope_stack: Vec<NodeId>,
    pending: Option<PendingElement<'a>>,
    options: ParseOptions,
}

impl<'d, 'a> TreeBuilder<'d, 'a> {
    fn run(&mut self, mut tokenizer: Tokenizer<'a>) -> Result<()> {
        let mut ns_scope = NamespaceScope::new(&mut self.doc.strings);

        loop {
            let Token { kind, position } = tokenizer.next_token()?;
            match kind {
                TokenKind::TagOpen(name) => {
                    self.finish_pending(&mut ns_scope)?;
                    self.pending = Some(PendingElement {
                        name,
                        position,
                        attrs: Vec::new(),
                    });
                }

                TokenKind::Attribute { name, value } => {
                    // The tokenizer only emits attributes directly after a
                    // tag-open token
                    if let Some(pending) = self.pending.as_mut() {
                        pending.attrs.push((name, value, position));
                    }
                }

                TokenKind::TagSelfClose(_) => {
                    self.finish_pending(&mut ns_scope)?;
                    self.scope_stack.pop();
                    ns_scope.pop_scope();
                }

                TokenKind::TagClose(name) => {
                    self.finish_pending(&mut ns_scope)?;
                    if self.scope_stack.len() <= 1 {
                        return Err(Error::malformed(
                            format!("closing tag </{name}> without open element"),
                            position,
                        ));
                    }
                    let top = *self.scope_stack.last().unwrap_or(&0);
                    let open_name = self.doc.name(top);
                    if open_name != name {
                        return Err(Error::MismatchedTag {
                            expected: open_name.to_string(),
                            found: name.to_string(),
                            position,
                        });
                    }
                    self.scope_stack.pop();
                    ns_scope.pop_scope();
                }

                TokenKind::Text(content) => {
                    self.finish_pending(&mut ns_scope)?;
                    self.add_text(&content, position)?;
                }

                TokenKind::Comment(content) => {
                    self.finish_pending(&mut ns_scope)?;
                    let parent = *self.scope_stack.last().unwrap_or(&0);
                    let content_id = self.doc.strings.intern(content);
                    let node = XmlNode::comment(content_id, parent, position as u32);
                    self.push_node(node, parent);
                }

                TokenKind::Eof => {
                    self.finish_pending(&mut ns_scope)?;
                    if self.scope_stack.len() > 1 {
                        let top = *self.scope_stack.last().unwrap_or(&0);
                        return Err(Error::UnclosedTag {
                            name: self.doc.name(top).to_string(),
                            position: self.doc.node(top).position as usize,
                        });
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Materialize the element whose attributes are now complete
    fn finish_pending(&mut self, ns_scope: &mut NamespaceScope) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let parent = *self.scope_stack.last().unwrap_or(&0);

        if parent == 0 && self.doc.root_element.is_some() {
            return Err(Error::malformed(
                "content not allowed after the root element",
                pending.position,
            ));
        }

        ns_scope.push_scope();

        // Register xmlns declarations first: they are in scope for the
        // element that carries them
        let ns_start = self.doc.ns_decls.len() as u32;
        for (name, value, _) in &pending.attrs {
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                let prefix_id = self.doc.strings.intern(prefix);
                let uri_id = self.doc.strings.intern(value);
                ns_scope.declare(prefix_id, uri_id);
                self.doc.ns_decls.push(NsDecl { prefix_id, uri_id });
            } else if *name == "xmlns" {
                let uri_id = self.doc.strings.intern(value);
                ns_scope.declare(0, uri_id);
                self.doc.ns_decls.push(NsDecl {
                    prefix_id: 0,
                    uri_id,
                });
            }
        }
        let ns_count = (self.doc.ns_decls.len() as u32 - ns_start) as u16;

        let (prefix, local) = split_qname(pending.name);
        let name_id = self.doc.strings.intern(pending.name);
        let mut node = XmlNode::element(name_id, parent, pending.position as u32);
        node.local_id = self.doc.strings.intern(local);
        node.ns_start = ns_start;
        node.ns_count = ns_count;

        // Resolve the element's namespace against the current scope,
        // falling back to "no namespace" for unbound prefixes
        match prefix {
            Some(p) => {
                node.prefix_id = self.doc.strings.intern(p);
                node.namespace_id = ns_scope.resolve(node.prefix_id).unwrap_or(0);
            }
            None => {
                node.namespace_id = ns_scope.resolve_default().unwrap_or(0);
            }
        }

        // Store attributes. Unprefixed attributes are never in a namespace;
        // the default namespace does not apply to them. Namespace
        // declarations live in the ns_decls arena only, so the attribute
        // axis never sees them.
        let attr_start = self.doc.attributes.len() as u32;
        for (i, (name, value, position)) in pending.attrs.iter().enumerate() {
            if pending.attrs[..i].iter().any(|(earlier, _, _)| earlier == name) {
                return Err(Error::malformed(
                    format!("duplicate attribute '{name}'"),
                    *position,
                ));
            }
            if *name == "xmlns" || name.starts_with("xmlns:") {
                continue;
            }
            let name_id = self.doc.strings.intern(name);
            let (prefix, local) = split_qname(name);
            let local_id = self.doc.strings.intern(local);
            let value_id = self.doc.strings.intern(value);
            let (prefix_id, namespace_id) = match prefix {
                None => (0, 0),
                Some(p) => {
                    let pid = self.doc.strings.intern(p);
                    (pid, ns_scope.resolve(pid).unwrap_or(0))
                }
            };
            self.doc.attributes.push(XmlAttribute {
                name_id,
                local_id,
                prefix_id,
                namespace_id,
                value_id,
            });
        }
        node.attr_start = attr_start;
        node.attr_count = (self.doc.attributes.len() as u32 - attr_start) as u16;

        let node_id = self.push_node(node, parent);
        if parent == 0 {
            self.doc.root_element = Some(node_id);
        }
        self.scope_stack.push(node_id);
        Ok(())
    }

    fn add_text(&mut self, content: &str, position: usize) -> Result<()> {
        let parent = *self.scope_stack.last().unwrap_or(&0);
        let is_whitespace = content.chars().all(|c| c.is_ascii_whitespace());

        if parent == 0 {
            // Inter-element whitespace at document level is not content
            if is_whitespace {
                return Ok(());
            }
            return Err(Error::malformed(
                "text content not allowed outside the root element",
                position,
            ));
        }
        if is_whitespace && !self.options.keep_whitespace_text {
            return Ok(());
        }

        let content_id = self.doc.strings.intern(content);
        let node = XmlNode::text(content_id, parent, position as u32);
        self.push_node(node, parent);
        Ok(())
    }

    /// Append a node to the arena and link it as the parent's last child
    fn push_node(&mut self, node: XmlNode, parent: NodeId) -> NodeId {
        let node_id = self.doc.nodes.len() as NodeId;
        self.doc.nodes.push(node);

        let last_child = self.doc.nodes[parent as usize].last_child;
        if let Some(prev) = last_child {
            self.doc.nodes[node_id as usize].prev_sibling = Some(prev);
            self.doc.nodes[prev as usize].next_sibling = Some(node_id);
        } else {
            self.doc.nodes[parent as usize].first_child = Some(node_id);
        }
        self.doc.nodes[parent as usize].last_child = Some(node_id);
        node_id
    }
}
