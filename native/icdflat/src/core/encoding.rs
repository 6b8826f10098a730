//! Encoding detection and conversion to UTF-8
//!
//! CMS ships the classification files as UTF-8, sometimes with a BOM. UTF-16
//! is accepted for files re-saved by desktop tools. Anything that does not
//! decode cleanly is reported, never patched up: a lossy decode would
//! silently alter codes and descriptions.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),
    #[error("invalid UTF-16: {0}")]
    InvalidUtf16(&'static str),
}

impl XmlEncoding {
    /// Detect encoding from a byte order mark or the first two bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            _ => XmlEncoding::Utf8,
        }
    }
}

/// Convert raw bytes to a UTF-8 string, stripping any BOM
pub fn decode_to_string(input: Vec<u8>) -> Result<String, EncodingError> {
    match XmlEncoding::detect(&input) {
        XmlEncoding::Utf8 => {
            let mut bytes = input;
            if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
                bytes.drain(..3);
            }
            String::from_utf8(bytes).map_err(|e| EncodingError::InvalidUtf8(e.utf8_error().valid_up_to()))
        }
        XmlEncoding::Utf16Le => decode_utf16(&input, &[0xFF, 0xFE], u16::from_le_bytes),
        XmlEncoding::Utf16Be => decode_utf16(&input, &[0xFE, 0xFF], u16::from_be_bytes),
    }
}

fn decode_utf16(input: &[u8], bom: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, EncodingError> {
    let bytes = input.strip_prefix(bom).unwrap_or(input);
    if bytes.len() % 2 != 0 {
        return Err(EncodingError::InvalidUtf16("odd number of bytes"));
    }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|_| EncodingError::InvalidUtf16("unpaired surrogate"))
}
