//! DOM Module - Arena-based XML Document
//!
//! - Arena allocation for nodes, NodeId (u32) links
//! - String interning for names and text
//! - `Fragment`: detached owned copy of a subtree for destructive reads

pub mod document;
pub mod fragment;
pub mod node;
pub mod strings;

pub use document::{DocumentError, XmlDocument};
pub use fragment::Fragment;
pub use node::{NodeId, NodeKind, XmlNode};

/// Read-only access to a parsed document tree
///
/// The flatteners only ever need the root, attributes, text and
/// children-by-tag lookups; everything beyond the required methods is
/// derived from the sibling links.
pub trait DocumentAccess {
    /// Root element id (not the document node)
    fn root_element_id(&self) -> Option<NodeId>;

    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Element name; None for non-element nodes
    fn node_name(&self, id: NodeId) -> Option<&str>;

    /// Content of a text or CDATA node
    fn text_content(&self, id: NodeId) -> Option<&str>;

    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str>;

    /// Direct children in document order, all node kinds
    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.get_node(id).and_then(|n| n.first_child);
        while let Some(child) = next {
            out.push(child);
            next = self.get_node(child).and_then(|n| n.next_sibling);
        }
        out
    }

    fn is_element(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(XmlNode::is_element)
    }

    /// Direct element children with the given tag name
    fn children_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.children_vec(id)
            .into_iter()
            .filter(|&c| self.node_name(c) == Some(tag))
            .collect()
    }

    fn first_child_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut next = self.get_node(id).and_then(|n| n.first_child);
        while let Some(child) = next {
            if self.node_name(child) == Some(tag) {
                return Some(child);
            }
            next = self.get_node(child).and_then(|n| n.next_sibling);
        }
        None
    }

    /// Element descendants with the given tag name, document order, `id` excluded
    fn descendants_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_vec(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if self.node_name(current) == Some(tag) {
                out.push(current);
            }
            stack.extend(self.children_vec(current).into_iter().rev());
        }
        out
    }

    /// Concatenated text of all descendant text nodes (DOM `textContent`)
    fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.get_node(current) {
                Some(node) if node.is_text() => out.push_str(self.text_content(current).unwrap_or("")),
                Some(node) if node.is_element() || current == id => {
                    stack.extend(self.children_vec(current).into_iter().rev());
                }
                _ => {}
            }
        }
        out
    }
}
