//! XML Document - Arena-based DOM representation
//!
//! Built in one pass from reader events. The document owns all of its
//! strings, so it can outlive the input buffer and be shared across rayon
//! workers read-only.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::core::encoding::{decode_to_string, EncodingError};
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;
use thiserror::Error;

/// Why a byte buffer could not be turned into a document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("malformed markup at byte {position}: {message}")]
    Malformed { message: &'static str, position: usize },
    #[error("tag mismatch: <{expected}> closed with </{found}>")]
    TagMismatch { expected: String, found: String },
    #[error("unexpected end tag </{0}>")]
    UnexpectedEndTag(String),
    #[error("unclosed tag <{0}>")]
    UnclosedTag(String),
    #[error("document has no root element")]
    NoRootElement,
}

impl DocumentError {
    /// Encoding failures mean the bytes themselves are damaged; everything
    /// else is a markup problem in an otherwise readable file.
    pub fn is_corruption(&self) -> bool {
        matches!(self, DocumentError::Encoding(_))
    }
}

/// An XML document stored in arena format
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    pub strings: StringPool,
    root_element: Option<NodeId>,
}

impl XmlDocument {
    /// Decode raw file bytes (BOM / UTF-16 aware) and parse them
    pub fn parse_bytes(input: Vec<u8>) -> Result<Self, DocumentError> {
        let text = decode_to_string(input)?;
        Self::parse(&text)
    }

    /// Parse an already decoded document
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let mut doc = XmlDocument {
            nodes: Vec::with_capacity(256),
            attributes: Vec::with_capacity(128),
            strings: StringPool::new(),
            root_element: None,
        };
        doc.nodes.push(XmlNode::document());
        doc.build_from_events(input.as_bytes())?;
        Ok(doc)
    }

    fn build_from_events(&mut self, input: &[u8]) -> Result<(), DocumentError> {
        let mut reader = SliceReader::new(input);
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(event) = reader.next_event() {
            match event {
                XmlEvent::StartElement(elem) => {
                    let id = self.push_element(&elem, &stack);
                    stack.push(id);
                }
                XmlEvent::EmptyElement(elem) => {
                    self.push_element(&elem, &stack);
                }
                XmlEvent::EndElement(end) => {
                    let found = String::from_utf8_lossy(end.name).into_owned();
                    if stack.len() == 1 {
                        return Err(DocumentError::UnexpectedEndTag(found));
                    }
                    let open = *stack.last().unwrap_or(&0);
                    let expected = self.node_name(open).unwrap_or_default();
                    if expected != found {
                        return Err(DocumentError::TagMismatch { expected: expected.to_string(), found });
                    }
                    stack.pop();
                }
                XmlEvent::Text(content) => {
                    // Whitespace between prolog items and after the root is noise
                    if stack.len() > 1 {
                        self.push_leaf(NodeKind::Text, &content, &stack);
                    }
                }
                XmlEvent::CData(content) => self.push_leaf(NodeKind::CData, &content, &stack),
                XmlEvent::Comment(content) => self.push_leaf(NodeKind::Comment, &content, &stack),
                XmlEvent::ProcessingInstruction { target } => {
                    self.push_leaf(NodeKind::ProcessingInstruction, target, &stack)
                }
                XmlEvent::DocType => {}
                XmlEvent::EndDocument => break,
            }
        }

        if let Some(err) = reader.error() {
            return Err(DocumentError::Malformed { message: err.message, position: err.position });
        }
        if let Some(&open) = stack.get(1) {
            let name = self.node_name(open).unwrap_or_default().to_string();
            return Err(DocumentError::UnclosedTag(name));
        }
        if self.root_element.is_none() {
            return Err(DocumentError::NoRootElement);
        }
        Ok(())
    }

    fn push_element(&mut self, elem: &StartElement<'_>, stack: &[NodeId]) -> NodeId {
        let parent_id = *stack.last().unwrap_or(&0);

        let name_id = self.strings.intern(&String::from_utf8_lossy(elem.name));
        let mut node = XmlNode::element(name_id);

        node.attr_start = self.attributes.len() as u32;
        for attr in &elem.attributes {
            let name_id = self.strings.intern(&String::from_utf8_lossy(attr.name));
            let value_id = self.strings.intern(&String::from_utf8_lossy(attr.value.as_ref()));
            self.attributes.push(XmlAttribute { name_id, value_id });
        }
        node.attr_count = elem.attributes.len() as u32;

        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent_id, node_id);

        if self.root_element.is_none() && parent_id == 0 {
            self.root_element = Some(node_id);
        }
        node_id
    }

    fn push_leaf(&mut self, kind: NodeKind, content: &[u8], stack: &[NodeId]) {
        let parent_id = *stack.last().unwrap_or(&0);
        let content_id = self.strings.intern(&String::from_utf8_lossy(content));
        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(XmlNode::leaf(kind, content_id));
        self.link_child(parent_id, node_id);
    }

    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        match self.nodes[parent_id as usize].last_child {
            Some(last) => self.nodes[last as usize].next_sibling = Some(child_id),
            None => self.nodes[parent_id as usize].first_child = Some(child_id),
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root_element.and_then(|id| self.node_name(id))
    }

    fn attribute_slice(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                let start = node.attr_start as usize;
                self.attributes.get(start..start + node.attr_count as usize).unwrap_or(&[])
            }
            _ => &[],
        }
    }
}

impl DocumentAccess for XmlDocument {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.is_element() {
            self.strings.get(node.name_id)
        } else {
            None
        }
    }

    fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.is_text() {
            self.strings.get(node.name_id)
        } else {
            None
        }
    }

    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attribute_slice(node_id)
            .iter()
            .find(|a| self.strings.get(a.name_id) == Some(name))
            .and_then(|a| self.strings.get(a.value_id))
    }
}
