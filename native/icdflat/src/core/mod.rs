//! Core XML parsing primitives
//!
//! - Scanner: memchr-accelerated delimiter search
//! - Tokenizer: lenient token extraction over a byte slice
//! - Entities: reference decoding with Cow (zero-copy when possible)
//! - Attributes: attribute parsing
//! - Encoding: BOM / UTF-16 detection and conversion to UTF-8

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
