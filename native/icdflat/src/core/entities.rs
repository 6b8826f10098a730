//! Entity reference decoding
//!
//! Classification files are mostly plain ASCII; `&amp;` and the odd numeric
//! reference (`&#233;` in eponyms) are the only entities that show up. Text
//! without an ampersand is returned borrowed.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references in text or attribute content
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let decoded = memchr(b';', &input[pos..]).and_then(|semi| {
            decode_entity(&input[pos + 1..pos + semi]).map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                let mut buf = [0u8; 4];
                result.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                pos += semi + 1;
            }
            None => {
                // Unknown or unterminated reference stays as written
                result.push(b'&');
                pos += 1;
            }
        }
    }
    result.extend_from_slice(&input[pos..]);
    result
}

/// Decode a single reference body (between '&' and ';')
fn decode_entity(entity: &[u8]) -> Option<char> {
    match entity {
        [] => None,
        [b'#', b'x' | b'X', hex @ ..] => {
            u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16)
                .ok()
                .and_then(char::from_u32)
        }
        [b'#', dec @ ..] => std::str::from_utf8(dec)
            .ok()?
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        b"nbsp" => Some('\u{00A0}'),
        b"ndash" => Some('\u{2013}'),
        b"mdash" => Some('\u{2014}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_is_borrowed() {
        let result = decode_text(b"Cholera due to Vibrio cholerae");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_named_entities() {
        let result = decode_text(b"Burn &amp; corrosion &lt;head&gt;");
        assert_eq!(result.as_ref(), b"Burn & corrosion <head>");
    }

    #[test]
    fn test_numeric_references() {
        let result = decode_text(b"Cr&#233;utzfeldt &#x41;");
        assert_eq!(std::str::from_utf8(result.as_ref()).unwrap(), "Cr\u{e9}utzfeldt A");
    }

    #[test]
    fn test_unknown_entity_kept() {
        let result = decode_text(b"&unknown; & done");
        assert_eq!(result.as_ref(), b"&unknown; & done");
    }
}
