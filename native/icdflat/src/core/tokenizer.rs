//! Pull tokenizer for XML markup
//!
//! Lenient by construction: the classification files are machine generated
//! and well-formed in practice, so the tokenizer does not validate names or
//! character classes. Structural problems (unclosed or mismatched tags) are
//! detected one level up when the DOM is built.

use super::entities::decode_text;
use super::scanner::Scanner;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name ...>`
    StartTag,
    /// `</name>`
    EndTag,
    /// `<name .../>`
    EmptyTag,
    Text,
    /// `<![CDATA[...]]>`
    CData,
    /// `<!--...-->`
    Comment,
    /// `<?target ...?>`, including the XML declaration
    ProcessingInstruction,
    /// `<!DOCTYPE ...>`, internal subset included
    DocType,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Tag or PI target name
    pub name: Option<&'a [u8]>,
    /// Text/CDATA/comment content, entity-decoded for text
    pub content: Option<Cow<'a, [u8]>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token { kind, span, name: None, content: None }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }
}

/// Position of the first byte the tokenizer could not make sense of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    pub message: &'static str,
    pub position: usize,
}

pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    done: bool,
    error: Option<TokenError>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let mut scanner = Scanner::new(input);
        scanner.skip_whitespace();
        Tokenizer { scanner, done: false, error: None }
    }

    /// First unrecoverable error, if tokenizing stopped early
    pub fn error(&self) -> Option<&TokenError> {
        self.error.as_ref()
    }

    /// Next token; `Eof` once, then None
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if self.done {
            return None;
        }
        if self.scanner.is_eof() {
            self.done = true;
            let pos = self.scanner.position();
            return Some(Token::new(TokenKind::Eof, (pos, pos)));
        }

        let token = match self.scanner.peek() {
            Some(b'<') => self.parse_markup(),
            _ => Some(self.parse_text()),
        };
        if token.is_none() {
            self.done = true;
        }
        token
    }

    fn fail(&mut self, message: &'static str, position: usize) -> Option<Token<'a>> {
        if self.error.is_none() {
            self.error = Some(TokenError { message, position });
        }
        None
    }

    fn parse_markup(&mut self) -> Option<Token<'a>> {
        let start = self.scanner.position();
        self.scanner.advance(1);

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => self.fail("unexpected end of input after '<'", start),
        }
    }

    fn parse_start_tag(&mut self, start: usize) -> Option<Token<'a>> {
        let Some(name) = self.scanner.read_name() else {
            return self.fail("invalid element name", start);
        };
        let Some(end) = self.scanner.find_tag_end_quoted() else {
            return self.fail("unterminated start tag", start);
        };

        let is_empty = self.scanner.slice(start, end).ends_with(b"/");
        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Some(Token::new(kind, (start, end + 1)).with_name(name))
    }

    fn parse_end_tag(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1);
        let Some(name) = self.scanner.read_name() else {
            return self.fail("invalid end tag name", start);
        };
        let Some(end) = self.scanner.find_sequence(b">") else {
            return self.fail("unterminated end tag", start);
        };
        self.scanner.set_position(end + 1);
        Some(Token::new(TokenKind::EndTag, (start, end + 1)).with_name(name))
    }

    fn parse_bang_markup(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1);
        if self.scanner.starts_with(b"--") {
            self.scanner.advance(2);
            self.parse_delimited(start, b"-->", TokenKind::Comment)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.scanner.advance(7);
            self.parse_delimited(start, b"]]>", TokenKind::CData)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            self.fail("unknown declaration", start)
        }
    }

    /// Comment or CDATA body up to `terminator`, content kept verbatim
    fn parse_delimited(&mut self, start: usize, terminator: &[u8], kind: TokenKind) -> Option<Token<'a>> {
        let content_start = self.scanner.position();
        let Some(end) = self.scanner.find_sequence(terminator) else {
            return self.fail("unterminated comment or CDATA section", start);
        };
        let content = self.scanner.slice(content_start, end);
        self.scanner.set_position(end + terminator.len());
        Some(Token::new(kind, (start, self.scanner.position())).with_content(Cow::Borrowed(content)))
    }

    /// DOCTYPE, skipping over a bracketed internal subset
    fn parse_doctype(&mut self, start: usize) -> Option<Token<'a>> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let remaining = self.scanner.remaining();

        for (i, &b) in remaining.iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if q == b => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    let end = self.scanner.position() + i + 1;
                    self.scanner.set_position(end);
                    return Some(Token::new(TokenKind::DocType, (start, end)));
                }
                _ => {}
            }
        }
        self.fail("unterminated DOCTYPE", start)
    }

    fn parse_pi(&mut self, start: usize) -> Option<Token<'a>> {
        self.scanner.advance(1);
        let Some(name) = self.scanner.read_name() else {
            return self.fail("invalid processing instruction target", start);
        };
        let Some(end) = self.scanner.find_sequence(b"?>") else {
            return self.fail("unterminated processing instruction", start);
        };
        self.scanner.set_position(end + 2);
        Some(Token::new(TokenKind::ProcessingInstruction, (start, end + 2)).with_name(name))
    }

    fn parse_text(&mut self) -> Token<'a> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(start + self.scanner.remaining().len());
        let content = self.scanner.slice(start, end);
        self.scanner.set_position(end);
        Token::new(TokenKind::Text, (start, end)).with_content(decode_text(content))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token()?;
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
