//! XML event types

use crate::core::attributes::Attribute;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement(EndElement<'a>),
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    Text(Cow<'a, [u8]>),
    CData(Cow<'a, [u8]>),
    Comment(Cow<'a, [u8]>),
    ProcessingInstruction { target: &'a [u8] },
    DocType,
    EndDocument,
}

#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    #[cfg(test)]
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    #[cfg(test)]
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name_str() == Some(name))
            .and_then(|a| a.value_str())
    }
}

#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    pub name: &'a [u8],
}

impl<'a> EndElement<'a> {
    #[cfg(test)]
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element_attribute_lookup() {
        let attrs = crate::core::attributes::parse_attributes(b" col=\"3\"");
        let elem = StartElement::new(b"cell", attrs);
        assert_eq!(elem.name_str(), Some("cell"));
        assert_eq!(elem.get_attribute_value("col"), Some("3"));
        assert_eq!(elem.get_attribute_value("row"), None);
    }
}
