//! Detached subtree copies
//!
//! The arena document is immutable. Reads that need to take a subtree apart
//! (pull an embedded code element out, then read what is left) work on a
//! `Fragment`: an owned copy that can be edited and dropped.

use super::{DocumentAccess, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Element { name: String, children: Vec<FragmentNode> },
    Text(String),
}

impl FragmentNode {
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            FragmentNode::Text(text) => out.push_str(text),
            FragmentNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FragmentNode::Element { name, .. } => Some(name.as_str()),
            FragmentNode::Text(_) => None,
        }
    }
}

/// Owned, editable copy of one element and its descendants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    root: FragmentNode,
}

impl Fragment {
    /// Deep-copy the subtree rooted at `id`; comments and PIs are left behind
    pub fn copy_of<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Self {
        Fragment { root: copy_node(doc, id).unwrap_or(FragmentNode::Text(String::new())) }
    }

    /// Detach the first descendant element (depth first, document order)
    /// whose name satisfies `matches`, returning it
    pub fn take_first(&mut self, matches: impl Fn(&str) -> bool) -> Option<FragmentNode> {
        take_first_in(&mut self.root, &matches)
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }
}

fn copy_node<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Option<FragmentNode> {
    let node = doc.get_node(id)?;
    match node.kind {
        NodeKind::Text | NodeKind::CData => Some(FragmentNode::Text(doc.text_content(id)?.to_string())),
        NodeKind::Element | NodeKind::Document => Some(FragmentNode::Element {
            name: doc.node_name(id).unwrap_or_default().to_string(),
            children: doc.children_vec(id).into_iter().filter_map(|c| copy_node(doc, c)).collect(),
        }),
        NodeKind::Comment | NodeKind::ProcessingInstruction => None,
    }
}

fn take_first_in(node: &mut FragmentNode, matches: &impl Fn(&str) -> bool) -> Option<FragmentNode> {
    let FragmentNode::Element { children, .. } = node else {
        return None;
    };
    for i in 0..children.len() {
        if children[i].name().is_some_and(matches) {
            return Some(children.remove(i));
        }
        if let Some(found) = take_first_in(&mut children[i], matches) {
            return Some(found);
        }
    }
    None
}
