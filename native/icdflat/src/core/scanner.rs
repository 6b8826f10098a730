//! Delimiter scanning over raw document bytes
//!
//! memchr does the heavy lifting (SSE2/AVX2/NEON where available), so a
//! multi-megabyte index file is walked without per-byte branching.

use memchr::{memchr, memmem};

/// Cursor over the input bytes
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.set_position(self.pos + n);
    }

    /// Skip XML whitespace (space, tab, CR, LF)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    /// Absolute position of the next '<'
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.remaining()).map(|i| self.pos + i)
    }

    /// Absolute position of the '>' closing the current tag, skipping any
    /// '>' that sits inside a quoted attribute value
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.remaining().iter().enumerate() {
            match (quote, b) {
                (None, b'"' | b'\'') => quote = Some(b),
                (Some(q), _) if q == b => quote = None,
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Absolute position of the next occurrence of `needle`
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Read an element or PI name and advance past it
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        if !self.peek().is_some_and(is_name_start_char) {
            return None;
        }
        self.pos += 1;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }
}

/// ASCII letters, underscore, colon, and any non-ASCII UTF-8 byte
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
