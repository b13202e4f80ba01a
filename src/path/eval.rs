//! Path evaluation
//!
//! Walks a compiled step sequence against a parsed document. Evaluation is
//! infallible: a path that matches nothing produces an empty set, and a
//! position predicate beyond the candidate count simply selects nothing.
//!
//! Each step maps every context item to its own candidate list, applies
//! the step's predicate within that list (so `[n]` counts per parent, not
//! globally), then merges the survivors, dropping duplicates and sorting
//! the merged list into document order.

use std::collections::HashSet;

use log::trace;

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::path::compiler::{Axis, CompiledPath, NameTest, Namespaces, Predicate, Step};
use crate::path::nodeset::{ItemRef, NodeSet};

const DOCUMENT_NODE: NodeId = 0;

impl Document {
    /// Compile and evaluate an expression in one call
    pub fn query(&self, expression: &str, namespaces: &Namespaces) -> Result<NodeSet<'_>> {
        let path = CompiledPath::compile(expression, namespaces)?;
        Ok(self.evaluate(&path))
    }

    /// Evaluate a compiled path against this document.
    ///
    /// Both absolute and relative paths start at the document node, so
    /// `/a/b` and `a/b` select the same items.
    pub fn evaluate(&self, path: &CompiledPath) -> NodeSet<'_> {
        // Bare "/" compiles to zero steps and selects the root element
        if path.steps().is_empty() {
            let items = self.root_element_id().map(ItemRef::Node).into_iter().collect();
            return NodeSet::new(self, items);
        }

        let mut context = vec![ItemRef::Node(DOCUMENT_NODE)];
        for step in path.steps() {
            context = self.apply_step(&context, step);
            if context.is_empty() {
                break;
            }
        }
        trace!("'{}' matched {} items", path.expression(), context.len());
        NodeSet::new(self, context)
    }

    fn apply_step(&self, context: &[ItemRef], step: &Step) -> Vec<ItemRef> {
        let mut merged = Vec::new();
        let mut seen = HashSet::new();
        for &item in context {
            // Attribute and text items have no children or attributes of
            // their own, so only element/document nodes contribute
            let ItemRef::Node(id) = item else { continue };
            let candidates = self.axis_candidates(id, step);
            for selected in self.apply_predicate(&candidates, step.predicate.as_ref()) {
                if seen.insert(selected) {
                    merged.push(selected);
                }
            }
        }
        merged
    }

    fn axis_candidates(&self, id: NodeId, step: &Step) -> Vec<ItemRef> {
        match step.axis {
            Axis::Child => self
                .children(id)
                .filter(|&c| self.element_matches(c, &step.test))
                .map(ItemRef::Node)
                .collect(),
            Axis::Descendant => self
                .descendants(id)
                .filter(|&c| self.element_matches(c, &step.test))
                .map(ItemRef::Node)
                .collect(),
            Axis::Attribute => self
                .matching_attributes(id, &step.test)
                .map(|index| ItemRef::Attribute(id, index))
                .collect(),
        }
    }

    fn apply_predicate(
        &self,
        candidates: &[ItemRef],
        predicate: Option<&Predicate>,
    ) -> Vec<ItemRef> {
        match predicate {
            None => candidates.to_vec(),
            // 1-based; out-of-range positions select nothing
            Some(Predicate::Position(n)) => n
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .map(|&item| vec![item])
                .unwrap_or_default(),
            Some(Predicate::AttrEquals { test, value }) => candidates
                .iter()
                .filter(|item| match item {
                    ItemRef::Node(id) => self
                        .matching_attributes(*id, test)
                        .any(|index| {
                            self.strings().get(self.attribute_at(*id, index).value_id)
                                == value.as_str()
                        }),
                    ItemRef::Attribute(..) => false,
                })
                .copied()
                .collect(),
        }
    }

    fn element_matches(&self, id: NodeId, test: &NameTest) -> bool {
        let Some(node) = self.get_node(id) else {
            return false;
        };
        if !node.is_element() {
            return false;
        }
        match test {
            NameTest::Any => true,
            NameTest::Name { local, uri } => {
                self.local_name(id) == local.as_str() && self.namespace(id) == uri.as_deref()
            }
        }
    }

    fn matching_attributes<'a>(
        &'a self,
        id: NodeId,
        test: &'a NameTest,
    ) -> impl Iterator<Item = u32> + 'a {
        self.attributes(id)
            .iter()
            .enumerate()
            .filter(move |(_, attr)| match test {
                NameTest::Any => true,
                NameTest::Name { local, uri } => {
                    let attr_uri = match attr.namespace_id {
                        0 => None,
                        nid => Some(self.strings().get(nid)),
                    };
                    self.strings().get(attr.local_id) == local.as_str()
                        && attr_uri == uri.as_deref()
                }
            })
            .map(|(index, _)| index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn doc(xml: &str) -> Document {
        Document::parse(xml).unwrap()
    }

    fn names(set: &NodeSet<'_>) -> Vec<String> {
        set.iter()
            .filter_map(|i| i.name().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_child_steps() {
        let d = doc("<a><b>1</b><c/><b>2</b></a>");
        let set = d.query("/a/b", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.first().unwrap().value(), "1");
        assert_eq!(set.last().unwrap().value(), "2");
    }

    #[test]
    fn test_relative_equals_absolute() {
        let d = doc("<a><b/></a>");
        let ns = Namespaces::new();
        assert_eq!(
            d.query("a/b", &ns).unwrap().len(),
            d.query("/a/b", &ns).unwrap().len()
        );
    }

    #[test]
    fn test_bare_root() {
        let d = doc("<root><x/></root>");
        let set = d.query("/", &Namespaces::new()).unwrap();
        assert_eq!(names(&set), ["root"]);
    }

    #[test]
    fn test_wildcard() {
        let d = doc("<a><b/><c/>text<d/></a>");
        let set = d.query("/a/*", &Namespaces::new()).unwrap();
        assert_eq!(names(&set), ["b", "c", "d"]);
    }

    #[test]
    fn test_descendant_dedupes_and_orders() {
        let d = doc("<a><b><c/><b><c/></b></b></a>");
        // "//b" matches the outer and inner b; "//b//c" reaches the inner
        // c through both, but it appears once
        let set = d.query("//b//c", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_position_is_per_parent() {
        let d = doc("<r><g><i>a</i><i>b</i></g><g><i>c</i></g></r>");
        let set = d.query("/r/g/i[1]", &Namespaces::new()).unwrap();
        let values: Vec<_> = set.iter().map(|i| i.value()).collect();
        assert_eq!(values, ["a", "c"]);
    }

    #[test]
    fn test_position_out_of_range_is_empty() {
        let d = doc("<a><b/></a>");
        let set = d.query("/a/b[5]", &Namespaces::new()).unwrap();
        assert!(set.is_empty());
        assert!(d.query("/a/b[0]", &Namespaces::new()).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_axis() {
        let d = doc(r#"<a><b x="1"/><b x="2"/></a>"#);
        let set = d.query("/a/b[2]/@x", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 1);
        let item = set.first().unwrap();
        assert!(item.is_attribute());
        assert_eq!(item.name(), Some("x"));
        assert_eq!(item.value(), "2");
    }

    #[test]
    fn test_attribute_wildcard() {
        let d = doc(r#"<a x="1" y="2"/>"#);
        let set = d.query("/a/@*", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).unwrap().value(), "1");
        assert_eq!(set.get(1).unwrap().value(), "2");
    }

    #[test]
    fn test_attr_equality_predicate() {
        let d = doc(r#"<a><b id="x">one</b><b id="y">two</b></a>"#);
        let set = d.query("/a/b[@id='y']", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().value(), "two");
    }

    #[test]
    fn test_namespaced_query() {
        let d = doc(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#);
        let ns = Namespaces::new().bind("s", "http://www.w3.org/2000/svg");
        let set = d.query("/s:svg/s:rect", &ns).unwrap();
        assert_eq!(set.len(), 1);
        // Unprefixed tests match no-namespace names only
        assert!(d.query("/svg", &ns).unwrap().is_empty());
    }

    #[test]
    fn test_default_prefix_unbound_means_no_namespace() {
        let d = doc("<a><b/></a>");
        let set = d.query("/ns:a/ns:b", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_namespaced_attribute() {
        let d = doc(r#"<a xmlns:m="uri:m"><b m:k="v"/></a>"#);
        let ns = Namespaces::new().bind("m", "uri:m");
        let set = d.query("/a/b/@m:k", &ns).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().namespace(), Some("uri:m"));
        // Unprefixed attributes are never in a namespace
        assert!(d.query("/a/b/@k", &ns).unwrap().is_empty());
    }

    #[test]
    fn test_attribute_axis_excludes_ns_declarations() {
        let d = doc(r#"<a xmlns:m="uri:m" m="plain" x="1"/>"#);
        let set = d.query("/a/@m", &Namespaces::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap().value(), "plain");

        let all = d.query("/a/@*", &Namespaces::new()).unwrap();
        let names: Vec<_> = all.iter().filter_map(|i| i.name()).collect();
        assert_eq!(names, ["m", "x"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let d = doc("<a/>");
        let set = d.query("/nothing/here", &Namespaces::new()).unwrap();
        assert!(set.is_empty());
        assert!(set.last().is_none());
    }

    #[test]
    fn test_bad_expression_is_error() {
        let d = doc("<a/>");
        assert!(matches!(
            d.query("", &Namespaces::new()),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_compiled_path_reusable_across_documents() {
        let path = CompiledPath::compile("//item", &Namespaces::new()).unwrap();
        let d1 = doc("<r><item/></r>");
        let d2 = doc("<r><item/><item/></r>");
        assert_eq!(d1.evaluate(&path).len(), 1);
        assert_eq!(d2.evaluate(&path).len(), 2);
    }

    #[test]
    fn test_steps_from_attribute_items_yield_nothing() {
        let d = doc(r#"<a x="1"/>"#);
        let set = d.query("/a/@x/*", &Namespaces::new()).unwrap();
        assert!(set.is_empty());
    }
}
