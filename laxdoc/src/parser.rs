// SPDX-License-Identifier: Apache-2.0

//! Recursive-descent parser for the permissive JSON dialect.
//!
//! Accepted on top of strict JSON:
//! * `'single'` and `` `backtick` `` strings, the latter expanding `${NAME}`
//! * bare attribute names and bare string values
//! * `=` or `=>` in place of `:`
//! * `( )` arrays, optional or trailing commas
//! * `#`, `//` and `/* */` comments
//! * `0x` hexadecimal integers

use std::path::Path;

use crate::byte_buffer::ByteBuffer;
use crate::lexer::{Delimiter, Lexer};
use crate::parse_error::{Error, ErrorKind, ParseError};
use crate::value::{Array, Object, Value};
use crate::writer::DEFAULT_MAX_DEPTH;

/// Runtime knobs for [`parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treat `#`, `//` and `/* */` as whitespace.
    pub comments: bool,
    /// Number of containers that may be open at once.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            comments: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Content found after a complete top-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailing {
    /// First byte of the ignored content.
    pub byte: u8,
    /// 0-based line it sits on.
    pub line: u32,
}

/// A successful parse, with a note about anything left unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub root: Value,
    pub trailing: Option<Trailing>,
}

/// Parses a document with the default options, ignoring trailing content.
pub fn parse(input: impl AsRef<[u8]>) -> Result<Value, ParseError> {
    parse_with(input.as_ref(), &ParseOptions::default()).map(|parsed| parsed.root)
}

/// Parses a document.
///
/// The first syntax error aborts the parse. Content after the top-level value
/// is not an error; it is logged and reported in [`Parsed::trailing`].
pub fn parse_with(input: &[u8], options: &ParseOptions) -> Result<Parsed, ParseError> {
    log::debug!("parsing {} bytes", input.len());
    let mut parser = Parser::new(input, options);
    parser.lexer.skip_space(b"");
    let root = parser.value(None)?;

    parser.lexer.skip_space(b"");
    let trailing = parser.lexer.peek().map(|byte| Trailing {
        byte,
        line: parser.lexer.line(),
    });
    if let Some(t) = trailing {
        log::warn!(
            "ignoring trailing '{}' at line {}",
            t.byte.escape_ascii(),
            t.line + 1
        );
    }
    log::debug!("parsed {} at line {}", root.value_type(), root.line());
    Ok(Parsed { root, trailing })
}

/// Reads and parses a whole file with the default options.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Value, Error> {
    parse_file_with(path, &ParseOptions::default()).map(|parsed| parsed.root)
}

pub fn parse_file_with(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Parsed, Error> {
    let mut text = ByteBuffer::new();
    text.load(path)?;
    Ok(parse_with(text.as_bytes(), options)?)
}

impl core::str::FromStr for Value {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Where a bare value token ends inside the document grammar.
fn bare_delimiter(byte: u8) -> Option<Delimiter> {
    match byte {
        b',' | b' ' | b'\t' | b'\r' | b'\n' => Some(Delimiter::Consume),
        b']' | b'}' | b')' => Some(Delimiter::Keep),
        _ => None,
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    max_depth: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8], options: &ParseOptions) -> Self {
        Self {
            lexer: Lexer::new(input, options.comments),
            max_depth: options.max_depth,
            depth: 0,
        }
    }

    fn error(&self, kind: ErrorKind) -> ParseError {
        self.lexer.error(kind)
    }

    /// Parses one value at the cursor. `opener` is the bracket of the
    /// enclosing container, if any.
    fn value(&mut self, opener: Option<u8>) -> Result<Value, ParseError> {
        let line = self.lexer.line();
        let value = match self.lexer.peek() {
            None => return Err(self.error(ErrorKind::UnexpectedEof)),
            Some(b'{') => self.object()?,
            Some(b'[') => self.array(b'[', b']')?,
            Some(b'(') => self.array(b'(', b')')?,
            Some(b'"' | b'\'' | b'`') => {
                let mut text = Vec::new();
                self.lexer.read_string(&mut text)?;
                Value::string(text)
            }
            Some(_) => match self.lexer.read_primitive() {
                Some(primitive) => primitive,
                None => self.bare(opener)?,
            },
        };
        Ok(value.with_line(line))
    }

    fn bare(&mut self, opener: Option<u8>) -> Result<Value, ParseError> {
        // a closer or separator where a value belongs
        if self.lexer.peek().and_then(bare_delimiter).is_some() {
            let kind = opener.map_or(ErrorKind::BadName, ErrorKind::NotClosed);
            return Err(self.error(kind));
        }
        let mut text = Vec::new();
        self.lexer.read_bare(&mut text, true, bare_delimiter);
        Ok(Value::string(text))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            log::debug!("nesting limit {} reached", self.max_depth);
            return Err(self.error(ErrorKind::TooDeep));
        }
        self.depth += 1;
        Ok(())
    }

    fn object(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.lexer.bump();
        let mut object = Object::new();
        loop {
            self.lexer.skip_space(b",");
            match self.lexer.peek() {
                None => return Err(self.error(ErrorKind::NotClosed(b'{'))),
                Some(b'}') => {
                    self.lexer.bump();
                    break;
                }
                Some(_) => {}
            }

            let name = self
                .lexer
                .read_attr_name()?
                .ok_or_else(|| self.error(ErrorKind::BadName))?;
            self.lexer.skip_space(b"");
            match self.lexer.peek() {
                Some(b':' | b'=') => self.lexer.bump(),
                _ => return Err(self.error(ErrorKind::Expected(b':'))),
            }
            self.lexer.skip_space(b">");

            let value = self.value(Some(b'{'))?;
            object
                .set(name.as_bytes(), value)
                .map_err(|_| self.error(ErrorKind::Capacity))?;
        }
        self.depth -= 1;
        Ok(Value::from(object))
    }

    fn array(&mut self, opener: u8, closer: u8) -> Result<Value, ParseError> {
        self.enter()?;
        self.lexer.bump();
        let mut array = Array::new();
        loop {
            self.lexer.skip_space(b",");
            match self.lexer.peek() {
                None => return Err(self.error(ErrorKind::NotClosed(opener))),
                Some(c) if c == closer => {
                    self.lexer.bump();
                    break;
                }
                Some(_) => {}
            }
            let item = self.value(Some(opener))?;
            array
                .push(item)
                .map_err(|_| self.error(ErrorKind::Capacity))?;
        }
        self.depth -= 1;
        Ok(Value::from(array))
    }
}
