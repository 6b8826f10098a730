//! Arena node representation
//!
//! Nodes refer to each other by NodeId (u32) so the whole tree is one Vec and
//! traversal stays cache friendly on the larger index files.

/// Index into the node arena
pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root (always id 0)
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// String pool id: element name / PI target, or content for text-like nodes
    pub name_id: u32,
    /// Start of this element's attributes in the attribute arena
    pub attr_start: u32,
    pub attr_count: u32,
}

impl XmlNode {
    pub fn document() -> Self {
        Self::new(NodeKind::Document, 0)
    }

    pub fn element(name_id: u32) -> Self {
        Self::new(NodeKind::Element, name_id)
    }

    /// Text, CDATA, comment or PI node carrying `content_id`
    pub fn leaf(kind: NodeKind, content_id: u32) -> Self {
        Self::new(kind, content_id)
    }

    fn new(kind: NodeKind, name_id: u32) -> Self {
        XmlNode {
            kind,
            first_child: None,
            last_child: None,
            next_sibling: None,
            name_id,
            attr_start: 0,
            attr_count: 0,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA, the two kinds that contribute to text content
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }
}

/// Stored attribute, both halves interned
#[derive(Debug, Clone, Copy)]
pub struct XmlAttribute {
    pub name_id: u32,
    pub value_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_node() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.first_child.is_none());
        assert_eq!(doc.name_id, 0);
    }

    #[test]
    fn test_leaf_kinds() {
        assert!(XmlNode::leaf(NodeKind::CData, 3).is_text());
        assert!(!XmlNode::leaf(NodeKind::Comment, 3).is_text());
        assert!(XmlNode::element(1).is_element());
    }
}
