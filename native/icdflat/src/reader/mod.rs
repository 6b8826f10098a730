//! Pull reader over the tokenizer
//!
//! - SliceReader: event reader over an in-memory document
//! - Events: event types consumed by the DOM builder

pub mod events;
pub mod slice;
