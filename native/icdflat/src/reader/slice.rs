//! Event reader over an in-memory document
//!
//! Tag names and attribute values borrow from the input; only text with
//! entity references is copied.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, Attribute};
use crate::core::scanner::is_whitespace;
use crate::core::tokenizer::{Token, TokenError, TokenKind, Tokenizer};

pub struct SliceReader<'a> {
    input: &'a [u8],
    tokenizer: Tokenizer<'a>,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader { input, tokenizer: Tokenizer::new(input) }
    }

    /// Tokenizer error that cut the event stream short
    pub fn error(&self) -> Option<&TokenError> {
        self.tokenizer.error()
    }

    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        let token = self.tokenizer.next_token()?;

        let event = match token.kind {
            TokenKind::Eof => XmlEvent::EndDocument,
            TokenKind::StartTag => {
                let attrs = self.tag_attributes(&token);
                XmlEvent::StartElement(StartElement::new(token.name?, attrs))
            }
            TokenKind::EmptyTag => {
                let attrs = self.tag_attributes(&token);
                XmlEvent::EmptyElement(StartElement::new(token.name?, attrs))
            }
            TokenKind::EndTag => XmlEvent::EndElement(EndElement { name: token.name? }),
            TokenKind::Text => XmlEvent::Text(token.content?),
            TokenKind::CData => XmlEvent::CData(token.content?),
            TokenKind::Comment => XmlEvent::Comment(token.content?),
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction { target: token.name? },
            TokenKind::DocType => XmlEvent::DocType,
        };
        Some(event)
    }

    /// Attributes sit between the tag name and the closing `>` or `/>`
    fn tag_attributes(&self, token: &Token<'a>) -> Vec<Attribute<'a>> {
        let (start, end) = token.span;
        let tag = &self.input[start..end];

        let mut pos = 1;
        while pos < tag.len() && !is_whitespace(tag[pos]) && tag[pos] != b'>' && tag[pos] != b'/' {
            pos += 1;
        }

        let mut attr_end = tag.len();
        if tag.ends_with(b"/>") {
            attr_end -= 2;
        } else if tag.ends_with(b">") {
            attr_end -= 1;
        }

        if pos >= attr_end {
            return Vec::new();
        }
        parse_attributes(&tag[pos..attr_end])
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event()? {
            XmlEvent::EndDocument => None,
            event => Some(event),
        }
    }
}
