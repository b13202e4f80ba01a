//! Materialized query results
//!
//! Evaluation produces a `NodeSet`: an owned, ordered, deduplicated list of
//! item references into the document the query ran against. The set is
//! fully materialized, so it can be indexed, counted, and iterated any
//! number of times without touching the evaluator again.

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{Error, Result};

/// Reference to one result item: an element/text node, or one attribute of
/// an element. `sort_key` yields document order: a node sorts before its
/// own attributes, and attributes sort in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Node(NodeId),
    Attribute(NodeId, u32),
}

impl ItemRef {
    fn sort_key(self) -> (NodeId, Option<u32>) {
        match self {
            ItemRef::Node(id) => (id, None),
            ItemRef::Attribute(id, index) => (id, Some(index)),
        }
    }
}

/// An ordered set of query results borrowed from a document
#[derive(Debug, Clone)]
pub struct NodeSet<'d> {
    doc: &'d Document,
    items: Vec<ItemRef>,
}

impl<'d> NodeSet<'d> {
    pub(crate) fn new(doc: &'d Document, mut items: Vec<ItemRef>) -> Self {
        items.sort_unstable_by_key(|item| item.sort_key());
        NodeSet { doc, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item in document order, `None` when empty
    pub fn first(&self) -> Option<Item<'d>> {
        self.get(0)
    }

    /// Last item in document order, `None` when empty
    pub fn last(&self) -> Option<Item<'d>> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Zero-based positional access
    pub fn get(&self, index: usize) -> Option<Item<'d>> {
        self.items.get(index).map(|&item| Item {
            doc: self.doc,
            item,
        })
    }

    /// Zero-based positional access with an explicit out-of-bounds error
    pub fn at(&self, index: usize) -> Result<Item<'d>> {
        self.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.len(),
        })
    }

    /// Iterate the results in document order. The iterator borrows the
    /// set, so iteration can restart from the beginning at any time.
    pub fn iter(&self) -> Iter<'d, '_> {
        Iter {
            set: self,
            index: 0,
        }
    }

}

impl<'d, 's> IntoIterator for &'s NodeSet<'d> {
    type Item = Item<'d>;
    type IntoIter = Iter<'d, 's>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Restartable iterator over a `NodeSet`
pub struct Iter<'d, 's> {
    set: &'s NodeSet<'d>,
    index: usize,
}

impl<'d> Iterator for Iter<'d, '_> {
    type Item = Item<'d>;

    fn next(&mut self) -> Option<Item<'d>> {
        let item = self.set.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_, '_> {}

/// One result item paired with its document, giving direct access to
/// names, values, and text without a separate handle type per kind
#[derive(Debug, Clone, Copy)]
pub struct Item<'d> {
    doc: &'d Document,
    item: ItemRef,
}

impl<'d> Item<'d> {
    /// Whether this item is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.item, ItemRef::Node(id)
            if self.doc.get_node(id).map(|n| n.is_element()).unwrap_or(false))
    }

    /// Whether this item is an attribute
    pub fn is_attribute(&self) -> bool {
        matches!(self.item, ItemRef::Attribute(..))
    }

    /// Qualified name of the element or attribute, `None` for other kinds
    pub fn name(&self) -> Option<&'d str> {
        match self.item {
            ItemRef::Node(id) => match self.doc.get_node(id)?.kind {
                NodeKind::Element => Some(self.doc.name(id)),
                _ => None,
            },
            ItemRef::Attribute(id, index) => {
                let attr = self.doc.attribute_at(id, index);
                Some(self.doc.strings().get(attr.name_id))
            }
        }
    }

    /// Local part of the name, without any prefix
    pub fn local_name(&self) -> Option<&'d str> {
        match self.item {
            ItemRef::Node(id) => match self.doc.get_node(id)?.kind {
                NodeKind::Element => Some(self.doc.local_name(id)),
                _ => None,
            },
            ItemRef::Attribute(id, index) => {
                let attr = self.doc.attribute_at(id, index);
                Some(self.doc.strings().get(attr.local_id))
            }
        }
    }

    /// Namespace URI, `None` for names in no namespace
    pub fn namespace(&self) -> Option<&'d str> {
        match self.item {
            ItemRef::Node(id) => self.doc.namespace(id),
            ItemRef::Attribute(id, index) => {
                match self.doc.attribute_at(id, index).namespace_id {
                    0 => None,
                    nid => Some(self.doc.strings().get(nid)),
                }
            }
        }
    }

    /// String value: attribute value, text content of a text node, or the
    /// concatenated descendant text of an element
    pub fn value(&self) -> String {
        match self.item {
            ItemRef::Node(id) => self.doc.string_value(id),
            ItemRef::Attribute(id, index) => {
                let attr = self.doc.attribute_at(id, index);
                self.doc.strings().get(attr.value_id).to_string()
            }
        }
    }

    /// Attribute lookup by qualified name on an element item
    pub fn attribute(&self, qname: &str) -> Option<&'d str> {
        match self.item {
            ItemRef::Node(id) => self.doc.attribute(id, qname),
            ItemRef::Attribute(..) => None,
        }
    }

    /// The element node id for an element item, or the owning element for
    /// an attribute item
    pub fn node_id(&self) -> NodeId {
        match self.item {
            ItemRef::Node(id) | ItemRef::Attribute(id, _) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn doc() -> Document {
        Document::parse(r#"<a><b x="1"/><b x="2"/></a>"#).unwrap()
    }

    #[test]
    fn test_empty_set_accessors() {
        let d = doc();
        let set = NodeSet::new(&d, Vec::new());
        assert!(set.is_empty());
        assert!(set.first().is_none());
        assert!(set.last().is_none());
        assert!(matches!(
            set.at(0),
            Err(Error::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_sorted_into_document_order() {
        let d = doc();
        let root = d.root_element_id().unwrap();
        let children: Vec<_> = d.children(root).collect();
        let set = NodeSet::new(
            &d,
            vec![ItemRef::Node(children[1]), ItemRef::Node(children[0])],
        );
        assert_eq!(set.get(0).unwrap().attribute("x"), Some("1"));
        assert_eq!(set.get(1).unwrap().attribute("x"), Some("2"));
    }

    #[test]
    fn test_attribute_sorts_after_owner() {
        let d = doc();
        let root = d.root_element_id().unwrap();
        let b = d.children(root).next().unwrap();
        let set = NodeSet::new(&d, vec![ItemRef::Attribute(b, 0), ItemRef::Node(b)]);
        assert!(set.get(0).unwrap().is_element());
        assert!(set.get(1).unwrap().is_attribute());
        assert_eq!(set.get(1).unwrap().value(), "1");
    }

    #[test]
    fn test_iteration_restarts() {
        let d = doc();
        let root = d.root_element_id().unwrap();
        let items: Vec<_> = d.children(root).map(ItemRef::Node).collect();
        let set = NodeSet::new(&d, items);
        assert_eq!(set.iter().count(), 2);
        assert_eq!(set.iter().count(), 2);
        let names: Vec<_> = set.iter().filter_map(|i| i.name()).collect();
        assert_eq!(names, ["b", "b"]);
    }
}
