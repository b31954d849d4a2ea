// SPDX-License-Identifier: Apache-2.0

//! INI reader.
//!
//! Assignments before the first `[section]` land in the root object; each
//! section becomes a nested object. `;` starts a comment. Values are quoted
//! strings, `true`/`false`/`null`, numbers, or bare words.

use std::path::Path;

use crate::byte_buffer::ByteBuffer;
use crate::lexer::{Delimiter, Lexer};
use crate::parse_error::{Error, ErrorKind, ParseError};
use crate::value::{Object, Value};

/// Parses an INI document into an object.
///
/// The whole input must be consumed. A repeated key or section replaces the
/// earlier one in place.
pub fn parse_ini(input: impl AsRef<[u8]>) -> Result<Value, ParseError> {
    let input = input.as_ref();
    log::debug!("parsing {} bytes of INI", input.len());
    let mut reader = IniReader {
        lexer: Lexer::new(input, false),
    };
    let root = reader.document()?;
    log::debug!("parsed {} INI entries", root.len());
    Ok(Value::from(root))
}

pub fn parse_ini_file(path: impl AsRef<Path>) -> Result<Value, Error> {
    let mut text = ByteBuffer::new();
    text.load(path)?;
    Ok(parse_ini(text.as_bytes())?)
}

fn bare_delimiter(byte: u8) -> Option<Delimiter> {
    match byte {
        b';' => Some(Delimiter::Keep),
        b' ' | b'\t' | b'\r' | b'\n' | 0x0B | 0x0C => Some(Delimiter::Consume),
        _ => None,
    }
}

struct IniReader<'a> {
    lexer: Lexer<'a>,
}

impl IniReader<'_> {
    fn error(&self, kind: ErrorKind) -> ParseError {
        self.lexer.error(kind)
    }

    /// Whitespace and `;` comment lines.
    fn skip_space(&mut self) {
        loop {
            self.lexer.skip_space(b"");
            if self.lexer.peek() != Some(b';') {
                return;
            }
            self.lexer.skip_line();
        }
    }

    fn document(&mut self) -> Result<Object, ParseError> {
        let mut root = Object::new();
        self.attributes(&mut root)?;
        while self.lexer.peek() == Some(b'[') {
            let line = self.lexer.line();
            let name = self.section_header()?;
            let mut section = Object::new();
            self.attributes(&mut section)?;
            root.set(&name, Value::from(section).with_line(line))
                .map_err(|_| self.error(ErrorKind::Capacity))?;
        }
        Ok(root)
    }

    fn section_header(&mut self) -> Result<Vec<u8>, ParseError> {
        self.lexer.bump();
        let raw = self
            .lexer
            .take_until(b']')
            .ok_or_else(|| self.error(ErrorKind::NotClosed(b'[')))?;
        let mut name = ByteBuffer::from(raw);
        name.strip();
        if name.is_empty() {
            return Err(self.error(ErrorKind::BadName));
        }
        Ok(name.as_bytes().to_vec())
    }

    /// Reads `key = value` lines until the next section header or the end.
    fn attributes(&mut self, section: &mut Object) -> Result<(), ParseError> {
        loop {
            self.skip_space();
            match self.lexer.peek() {
                None | Some(b'[') => return Ok(()),
                Some(_) => {}
            }

            let name = self
                .lexer
                .read_attr_name()?
                .ok_or_else(|| self.error(ErrorKind::BadName))?;
            self.skip_space();
            match self.lexer.peek() {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some(b'=') => self.lexer.bump(),
                Some(_) => return Err(self.error(ErrorKind::Expected(b'='))),
            }

            let value = self.value()?;
            section
                .set(name.as_bytes(), value)
                .map_err(|_| self.error(ErrorKind::Capacity))?;
        }
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip_space();
        let line = self.lexer.line();
        let value = match self.lexer.peek() {
            None => return Err(self.error(ErrorKind::UnexpectedEof)),
            Some(b'"' | b'\'' | b'`') => {
                let mut text = Vec::new();
                self.lexer.read_string(&mut text)?;
                Value::string(text)
            }
            Some(_) => match self.lexer.read_primitive() {
                Some(primitive) => primitive,
                None => {
                    let mut text = Vec::new();
                    // copied as written, `${NAME}` included
                    self.lexer.read_bare(&mut text, false, bare_delimiter);
                    Value::string(text)
                }
            },
        };
        Ok(value.with_line(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_globals_then_sections() {
        let root = parse_ini("a=1\n[s]\nb=2").unwrap();
        assert_eq!(root.select_integer("a"), 1);
        assert_eq!(root.select_integer("s.b"), 2);
        assert_eq!(root.select("s").unwrap().line(), 1);
        assert_eq!(root.select("s.b").unwrap().line(), 2);
    }

    #[test]
    fn test_value_forms() {
        let text = "\
; leading comment
name = \"Joe Bloggs\"  ; trailing comment
path = /usr/local/bin;inline
ratio = 0.5
on = true
none = null
  [ server main ]
host=example.org
";
        let root = parse_ini(text).unwrap();
        assert_eq!(root.select_string("name"), Some(&b"Joe Bloggs"[..]));
        assert_eq!(root.select_string("path"), Some(&b"/usr/local/bin"[..]));
        assert_eq!(root.select("ratio"), Some(&Value::float(0.5)));
        assert_eq!(root.select("on"), Some(&Value::bool(true)));
        assert!(root.select("none").unwrap().is_null());
        let server = root.as_object().unwrap().get_object(b"server main").unwrap();
        assert_eq!(server.get_string(b"host"), Some(&b"example.org"[..]));
    }

    #[test]
    fn test_bare_values_are_not_interpolated() {
        std::env::set_var("LAXDOC_INI_HOME", "/home/ini");
        let text = "plain = ${LAXDOC_INI_HOME}/x\nquoted = `${LAXDOC_INI_HOME}`\n";
        let root = parse_ini(text).unwrap();
        assert_eq!(root.select_string("plain"), Some(&b"${LAXDOC_INI_HOME}/x"[..]));
        assert_eq!(root.select_string("quoted"), Some(&b"/home/ini"[..]));
    }

    #[test]
    fn test_repeated_section_replaces() {
        let root = parse_ini("[s]\na=1\n[t]\n[s]\nb=2\n").unwrap();
        let keys: Vec<_> = root.as_object().unwrap().keys().collect();
        assert_eq!(keys, [&b"s"[..], &b"t"[..]]);
        assert_eq!(root.select_integer("s.b"), 2);
        assert!(root.select("s.a").is_none());
    }

    #[test]
    fn test_errors() {
        let cases: [(&str, ErrorKind, u32); 6] = [
            ("a", ErrorKind::UnexpectedEof, 0),
            ("a\n: 1", ErrorKind::Expected(b'='), 1),
            ("a=", ErrorKind::UnexpectedEof, 0),
            ("[open\nx=1", ErrorKind::NotClosed(b'['), 1),
            ("[  ]\n", ErrorKind::BadName, 0),
            ("=1", ErrorKind::BadName, 0),
        ];
        for &(text, kind, line) in &cases {
            let err = parse_ini(text).unwrap_err();
            assert_eq!((err.kind(), err.line()), (kind, line), "{text:?}");
        }
    }
}
