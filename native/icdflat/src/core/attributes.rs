//! Attribute parsing from raw tag content

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use std::borrow::Cow;

/// A parsed attribute, value entity-decoded
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    pub name: &'a [u8],
    pub value: Cow<'a, [u8]>,
}

#[cfg(test)]
impl<'a> Attribute<'a> {
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }
}

/// Parse attributes from the bytes between the element name and the closing
/// `>` / `/>`.
///
/// Lenient: stray bytes are skipped, valueless attributes get an empty
/// value, unquoted values run to the next whitespace.
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] == b'/' || input[pos] == b'>' {
            break;
        }
        if !is_name_start_char(input[pos]) {
            pos += 1;
            continue;
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] != b'=' {
            attrs.push(Attribute { name, value: Cow::Borrowed(b"") });
            continue;
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            attrs.push(Attribute { name, value: Cow::Borrowed(b"") });
            break;
        }

        let value = match input[pos] {
            quote @ (b'"' | b'\'') => {
                let start = pos + 1;
                let end = memchr::memchr(quote, &input[start..]).map_or(input.len(), |i| start + i);
                pos = (end + 1).min(input.len());
                decode_text(&input[start..end])
            }
            _ => {
                let start = pos;
                while pos < input.len() && !is_whitespace(input[pos]) && input[pos] != b'/' && input[pos] != b'>' {
                    pos += 1;
                }
                decode_text(&input[start..pos])
            }
        };
        attrs.push(Attribute { name, value });
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" col=\"2\" level='1'");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name_str(), Some("col"));
        assert_eq!(attrs[0].value_str(), Some("2"));
        assert_eq!(attrs[1].name_str(), Some("level"));
        assert_eq!(attrs[1].value_str(), Some("1"));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(b" title=\"Burn &amp; corrosion\"");
        assert_eq!(attrs[0].value_str(), Some("Burn & corrosion"));
    }

    #[test]
    fn test_whitespace_and_unquoted() {
        let attrs = parse_attributes(b"  id  =  \"A00-A09\" char=A ");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value_str(), Some("A00-A09"));
        assert_eq!(attrs[1].value_str(), Some("A"));
    }

    #[test]
    fn test_empty() {
        assert!(parse_attributes(b"").is_empty());
        assert!(parse_attributes(b" /").is_empty());
    }
}
