// SPDX-License-Identifier: Apache-2.0

//! Byte-level scanning shared by the document and INI parsers.
//!
//! The lexer owns the cursor into the input and the 0-based line counter.
//! A line ends at `\n`, or at a `\r` that is not followed by `\n`.

use crate::byte_buffer::ByteBuffer;
use crate::parse_error::{ErrorKind, ParseError};
use crate::unicode;
use crate::value::Value;

/// Longest environment variable name kept by `${NAME}`; the rest is dropped.
const MAX_ENV_NAME: usize = 255;

/// True for bytes that end a keyword or bare attribute name.
pub fn is_break(byte: u8) -> bool {
    !byte.is_ascii_alphanumeric() && byte != b'_'
}

/// What a bare token does with the byte that ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Swallow the byte (separators and whitespace).
    Consume,
    /// Leave it for the caller (closing brackets, comment markers).
    Keep,
}

#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    comments: bool,
}

impl<'a> Lexer<'a> {
    /// With `comments`, `#`, `//` and `/* */` count as whitespace.
    pub fn new(input: &'a [u8], comments: bool) -> Self {
        Self {
            input,
            pos: 0,
            line: 0,
            comments,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Moves past the current byte.
    pub fn bump(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    /// An error of `kind` at the current line.
    pub fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::new(kind, self.line)
    }

    /// Consumes one byte, counting it if it ends a line.
    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' || (c == b'\r' && self.peek() != Some(b'\n')) {
            self.line += 1;
        }
        Some(c)
    }

    /// Skips spaces, tabs, line breaks, any byte in `seps` and, when
    /// enabled, comments.
    pub fn skip_space(&mut self, seps: &[u8]) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'#' if self.comments => self.skip_line(),
                b'/' if self.comments && self.peek_at(1) == Some(b'/') => self.skip_line(),
                b'/' if self.comments && self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                _ if seps.contains(&c) => self.pos += 1,
                _ => break,
            }
        }
    }

    /// Skips past the end of the current line.
    pub fn skip_line(&mut self) {
        let line = self.line;
        while self.line == line && self.advance().is_some() {}
    }

    /// Skips a `/* */` comment; an unterminated one runs to the end of input.
    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while !self.is_eof() {
            if self.input[self.pos..].starts_with(b"*/") {
                self.pos += 2;
                return;
            }
            self.advance();
        }
    }

    /// Consumes `keyword` if the input starts with it and the byte after it
    /// cannot continue an identifier.
    pub fn skip_keyword(&mut self, keyword: &[u8]) -> bool {
        let rest = &self.input[self.pos..];
        if !rest.starts_with(keyword) {
            return false;
        }
        match rest.get(keyword.len()) {
            Some(&next) if !is_break(next) => false,
            _ => {
                self.pos += keyword.len();
                true
            }
        }
    }

    /// Reads `true`, `false`, `null` or a number.
    pub fn read_primitive(&mut self) -> Option<Value> {
        let line = self.line;
        let value = match self.peek()? {
            b'0'..=b'9' | b'-' | b'.' => self.read_number(),
            b't' if self.skip_keyword(b"true") => Some(Value::bool(true)),
            b'f' if self.skip_keyword(b"false") => Some(Value::bool(false)),
            b'n' if self.skip_keyword(b"null") => Some(Value::null()),
            _ => None,
        };
        value.map(|v| v.with_line(line))
    }

    /// Reads a numeric literal. It is a float if a `.` was consumed, otherwise
    /// an integer.
    ///
    /// Leaves the cursor alone and returns `None` when the text is not a
    /// number, is not finite, or runs straight into more token characters
    /// (`1.2.3`, `12ab`); such text is a bare string.
    pub fn read_number(&mut self) -> Option<Value> {
        let start = self.pos;
        let bytes = self.input;
        let mut i = start;
        let negative = bytes.get(i) == Some(&b'-');
        if negative {
            i += 1;
        }

        let value = if bytes.get(i) == Some(&b'0')
            && matches!(bytes.get(i + 1), Some(b'x' | b'X'))
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            i += 2;
            let digits_start = i;
            while bytes.get(i).is_some_and(u8::is_ascii_hexdigit) {
                i += 1;
            }
            let magnitude = bytes[digits_start..i]
                .iter()
                .filter_map(|&b| unicode::hex_digit(b))
                .fold(0u64, |n, d| n.saturating_mul(16).saturating_add(u64::from(d)));
            let signed = if negative {
                0i64.saturating_sub_unsigned(magnitude)
            } else {
                i64::try_from(magnitude).unwrap_or(i64::MAX)
            };
            Value::integer(signed)
        } else {
            let int_start = i;
            while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
            let mut digits = i - int_start;
            let mut is_float = false;
            if bytes.get(i) == Some(&b'.') {
                is_float = true;
                i += 1;
                let frac_start = i;
                while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                    i += 1;
                }
                digits += i - frac_start;
            }
            if digits == 0 {
                return None;
            }
            let mut has_exponent = false;
            if matches!(bytes.get(i), Some(b'e' | b'E')) {
                let mut j = i + 1;
                if matches!(bytes.get(j), Some(b'+' | b'-')) {
                    j += 1;
                }
                if bytes.get(j).is_some_and(u8::is_ascii_digit) {
                    while bytes.get(j).is_some_and(u8::is_ascii_digit) {
                        j += 1;
                    }
                    i = j;
                    has_exponent = true;
                }
            }

            // the scanned range is ASCII
            let text = core::str::from_utf8(&bytes[start..i]).ok()?;
            if is_float {
                let f: f64 = text.parse().ok()?;
                if !f.is_finite() {
                    return None;
                }
                Value::float(f)
            } else if let (false, Ok(n)) = (has_exponent, text.parse::<i64>()) {
                Value::integer(n)
            } else {
                let f: f64 = text.parse().ok()?;
                if !f.is_finite() {
                    return None;
                }
                // saturates at the i64 range
                Value::integer(f as i64)
            }
        };

        match bytes.get(i) {
            Some(&next) if !is_break(next) || next == b'.' => None,
            _ => {
                self.pos = i;
                Some(value)
            }
        }
    }

    /// Decodes a string quoted with `"`, `'` or `` ` `` starting at the cursor
    /// and appends its content to `out`. Backtick strings expand `${NAME}`.
    pub fn read_string(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'' | b'`')) => q,
            _ => return Err(self.error(ErrorKind::BadName)),
        };
        self.pos += 1;

        // an unterminated string is reported on the line of its last byte
        let mut last_line = self.line;
        loop {
            let line = self.line;
            let Some(c) = self.advance() else {
                return Err(ParseError::new(ErrorKind::UnexpectedEof, last_line));
            };
            last_line = line;
            match c {
                _ if c == quote => return Ok(()),
                b'\\' => self.read_escape(out)?,
                b'$' if quote == b'`' && self.peek() == Some(b'{') => self.read_env(out),
                _ => out.push(c),
            }
        }
    }

    /// Decodes the escape whose backslash was just consumed.
    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let escape_char = self
            .peek()
            .ok_or_else(|| self.error(ErrorKind::UnexpectedEof))?;
        if escape_char == b'u' {
            let (ch, width) = unicode::unescape_unicode(&self.input[self.pos - 1..])
                .map_err(|kind| self.error(kind))?;
            let mut utf8 = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            self.pos += width - 1;
            return Ok(());
        }
        let byte = unicode::unescape_simple(escape_char)
            .ok_or_else(|| self.error(ErrorKind::BadEscape))?;
        out.push(byte);
        self.pos += 1;
        Ok(())
    }

    /// Expands `${NAME}` with the cursor on the `{`.
    ///
    /// The name runs to the next `}` and stops early at a backtick. An
    /// undefined variable or unterminated reference is copied through
    /// literally; `${}` stays `${}`.
    fn read_env(&mut self, out: &mut Vec<u8>) {
        let brace = self.pos;
        self.pos += 1;
        let mut name = Vec::new();
        let mut closed = false;
        while let Some(c) = self.peek() {
            if c == b'`' {
                break;
            }
            self.advance();
            if c == b'}' {
                closed = true;
                break;
            }
            if name.len() < MAX_ENV_NAME {
                name.push(c);
            }
        }

        if name.is_empty() {
            out.extend_from_slice(b"${}");
            return;
        }
        let expanded = if closed { env_value(&name) } else { None };
        match expanded {
            Some(value) => {
                log::trace!("expanded ${{{}}}", String::from_utf8_lossy(&name));
                out.extend_from_slice(&value);
            }
            None => {
                out.push(b'$');
                out.extend_from_slice(&self.input[brace..self.pos]);
            }
        }
    }

    /// Reads an unquoted token up to the first byte `delimiter` classifies.
    /// With `interpolate`, `${NAME}` is expanded along the way.
    pub fn read_bare(
        &mut self,
        out: &mut Vec<u8>,
        interpolate: bool,
        delimiter: impl Fn(u8) -> Option<Delimiter>,
    ) {
        while let Some(c) = self.peek() {
            match delimiter(c) {
                Some(Delimiter::Consume) => {
                    self.advance();
                    return;
                }
                Some(Delimiter::Keep) => return,
                None => {}
            }
            self.pos += 1;
            if interpolate && c == b'$' && self.peek() == Some(b'{') {
                self.read_env(out);
            } else {
                out.push(c);
            }
        }
    }

    /// Consumes up to and including the next `stop` and returns the bytes
    /// before it, or `None` if the input ends first.
    pub fn take_until(&mut self, stop: u8) -> Option<&'a [u8]> {
        let start = self.pos;
        while let Some(c) = self.advance() {
            if c == stop {
                return Some(&self.input[start..self.pos - 1]);
            }
        }
        None
    }

    /// Reads a quoted name or a run of `[A-Za-z0-9_]`. `Ok(None)` means no
    /// name starts here.
    pub fn read_attr_name(&mut self) -> Result<Option<ByteBuffer>, ParseError> {
        let mut name = Vec::new();
        match self.peek() {
            Some(b'"' | b'\'' | b'`') => {
                self.read_string(&mut name)?;
                return Ok(Some(ByteBuffer::from(name)));
            }
            _ => {
                while let Some(c) = self.peek().filter(|&c| !is_break(c)) {
                    name.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok((!name.is_empty()).then(|| ByteBuffer::from(name)))
    }
}

/// Looks up an environment variable by raw name.
fn env_value(name: &[u8]) -> Option<Vec<u8>> {
    let name = core::str::from_utf8(name).ok()?;
    if name.contains(|c| c == '=' || c == '\0') {
        return None;
    }
    std::env::var_os(name).map(|v| v.into_encoded_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn string_of(input: &[u8]) -> Result<String, ParseError> {
        let mut lexer = Lexer::new(input, true);
        let mut out = Vec::new();
        lexer.read_string(&mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_skip_space_counts_lines() {
        let mut lexer = Lexer::new(b" \t\n\r\n\r x", false);
        lexer.skip_space(b"");
        assert_eq!(lexer.peek(), Some(b'x'));
        assert_eq!(lexer.line(), 3);
    }

    #[test]
    fn test_skip_space_with_separators_and_comments() {
        let input = b",, # hash\n // slashes\n /* block\n spans */ , x";
        let mut lexer = Lexer::new(input, true);
        lexer.skip_space(b",");
        assert_eq!(lexer.peek(), Some(b'x'));
        assert_eq!(lexer.line(), 3);

        // without comment support the hash is a token
        let mut lexer = Lexer::new(b"  # x", false);
        lexer.skip_space(b"");
        assert_eq!(lexer.peek(), Some(b'#'));
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let mut lexer = Lexer::new(b"/* open\n", true);
        lexer.skip_space(b"");
        assert!(lexer.is_eof());
        assert_eq!(lexer.line(), 1);
    }

    #[test]
    fn test_keywords_need_a_break() {
        let mut lexer = Lexer::new(b"truex", false);
        assert!(!lexer.skip_keyword(b"true"));
        assert_eq!(lexer.peek(), Some(b't'));
        let mut lexer = Lexer::new(b"true,", false);
        assert!(lexer.skip_keyword(b"true"));
        assert_eq!(lexer.peek(), Some(b','));
        let mut lexer = Lexer::new(b"null", false);
        assert_eq!(lexer.read_primitive(), Some(Value::null()));
    }

    fn number(input: &str) -> Option<ValueKind> {
        Lexer::new(input.as_bytes(), false)
            .read_number()
            .map(Value::into_kind)
    }

    #[test]
    fn test_number_classification() {
        assert_eq!(number("42"), Some(ValueKind::Integer(42)));
        assert_eq!(number("-7,"), Some(ValueKind::Integer(-7)));
        assert_eq!(number("1.5"), Some(ValueKind::Float(1.5)));
        assert_eq!(number("1."), Some(ValueKind::Float(1.0)));
        assert_eq!(number(".25"), Some(ValueKind::Float(0.25)));
        assert_eq!(number("2e3"), Some(ValueKind::Integer(2000)));
        assert_eq!(number("2.5E-1]"), Some(ValueKind::Float(0.25)));
        assert_eq!(number("0x1F"), Some(ValueKind::Integer(31)));
        assert_eq!(number("-0x10"), Some(ValueKind::Integer(-16)));
        assert_eq!(
            number("9223372036854775807"),
            Some(ValueKind::Integer(i64::MAX))
        );
        assert_eq!(
            number("99999999999999999999"),
            Some(ValueKind::Integer(i64::MAX))
        );
    }

    #[test]
    fn test_non_numbers_are_left_alone() {
        for text in ["-", ".", "-.", "1e999", "1.2.3", "12ab", "1.0e999"] {
            let mut lexer = Lexer::new(text.as_bytes(), false);
            assert!(lexer.read_number().is_none(), "{text}");
            assert_eq!(lexer.peek(), text.bytes().next(), "{text}");
        }
        // a dangling exponent marker is not consumed, and stops the number
        assert!(number("5e").is_none());
        assert_eq!(number("5e+ "), None);
    }

    #[test]
    fn test_string_quotes_and_escapes() {
        assert_eq!(string_of(br#""a\"b""#).unwrap(), "a\"b");
        assert_eq!(string_of(b"'it''").unwrap(), "it");
        assert_eq!(string_of(br#""\/\\\b\f\n\r\t""#).unwrap(), "/\\\u{8}\u{c}\n\r\t");
        assert_eq!(string_of("\"é😀\"".as_bytes()).unwrap(), "é😀");
        assert_eq!(string_of(b"\"$HOME ${\"").unwrap(), "$HOME ${");
    }

    #[test]
    fn test_string_errors() {
        let err = string_of(b"\"abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        let err = string_of(b"\"a\nb\nc").unwrap_err();
        assert_eq!((err.kind(), err.line()), (ErrorKind::UnexpectedEof, 2));
        let err = string_of(b"\"abc\n").unwrap_err();
        assert_eq!((err.kind(), err.line()), (ErrorKind::UnexpectedEof, 0));
        let err = string_of(b"'a\r\nb\r\n").unwrap_err();
        assert_eq!((err.kind(), err.line()), (ErrorKind::UnexpectedEof, 1));
        assert_eq!(string_of(br#""\q""#).unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(string_of(br#""\ud83d""#).unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(string_of(b"\"\\").unwrap_err().kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_backtick_interpolation() {
        std::env::set_var("LAXDOC_LEXER_GREETING", "bar");
        std::env::remove_var("LAXDOC_LEXER_UNSET");
        assert_eq!(
            string_of(b"`hello ${LAXDOC_LEXER_GREETING}!`").unwrap(),
            "hello bar!"
        );
        assert_eq!(
            string_of(b"`hello ${LAXDOC_LEXER_UNSET}`").unwrap(),
            "hello ${LAXDOC_LEXER_UNSET}"
        );
        assert_eq!(string_of(b"`a ${} b`").unwrap(), "a ${} b");
        // unterminated reference stops at the closing backtick
        assert_eq!(string_of(b"`x ${OPEN`").unwrap(), "x ${OPEN");
        // only backticks interpolate
        assert_eq!(
            string_of(b"'${LAXDOC_LEXER_GREETING}'").unwrap(),
            "${LAXDOC_LEXER_GREETING}"
        );
    }

    #[test]
    fn test_bare_token_delimiters() {
        let stop = |c: u8| match c {
            b',' => Some(Delimiter::Consume),
            b']' => Some(Delimiter::Keep),
            _ => None,
        };
        let mut lexer = Lexer::new(b"abc,def]", false);
        let mut out = Vec::new();
        lexer.read_bare(&mut out, true, stop);
        assert_eq!(out, b"abc");
        out.clear();
        lexer.read_bare(&mut out, true, stop);
        assert_eq!(out, b"def");
        assert_eq!(lexer.peek(), Some(b']'));

        std::env::set_var("LAXDOC_LEXER_BARE", "v");
        let mut lexer = Lexer::new(b"${LAXDOC_LEXER_BARE}]", false);
        out.clear();
        lexer.read_bare(&mut out, false, stop);
        assert_eq!(out, b"${LAXDOC_LEXER_BARE}");
    }

    #[test]
    fn test_take_until() {
        let mut lexer = Lexer::new(b"[ main ]\nrest", false);
        lexer.bump();
        assert_eq!(lexer.take_until(b']'), Some(&b" main "[..]));
        assert_eq!(lexer.peek(), Some(b'\n'));
        assert_eq!(lexer.take_until(b']'), None);
        assert!(lexer.is_eof());
        assert_eq!(lexer.line(), 1);
    }

    #[test]
    fn test_attr_names() {
        let mut lexer = Lexer::new(b"key_1: v", false);
        assert_eq!(lexer.read_attr_name().unwrap().unwrap(), "key_1");
        assert_eq!(lexer.peek(), Some(b':'));
        let mut lexer = Lexer::new(b"'a b'=", false);
        assert_eq!(lexer.read_attr_name().unwrap().unwrap(), "a b");
        let mut lexer = Lexer::new(b":", false);
        assert_eq!(lexer.read_attr_name().unwrap(), None);
    }
}
