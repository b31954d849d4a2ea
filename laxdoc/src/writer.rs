// SPDX-License-Identifier: Apache-2.0

//! Renders a [`Value`] tree back to JSON text.
//!
//! Undefined values are left out of arrays and objects. Control characters
//! are always escaped; everything else is controlled by [`WriteOptions`].

use std::path::Path;

use crate::byte_buffer::ByteBuffer;
use crate::parse_error::{Error, WriteError};
use crate::unicode;
use crate::value::{Array, Attribute, ExportFlags, Object, Value, ValueKind};

/// Default nesting limit for parsing and writing.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Output settings. Every flag is independent of the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// One member per line, indented by `indent` spaces per level.
    pub pretty: bool,
    pub indent: usize,
    /// Emit object keys in byte order instead of insertion order.
    pub sort_keys: bool,
    /// Write non-ASCII UTF-8 as `\uXXXX` escapes.
    pub escape_unicode: bool,
    /// Prefix flagged values with `&` / `@`.
    pub export_sigils: bool,
    /// Deepest container nesting that will be written.
    pub max_depth: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 2,
            sort_keys: false,
            escape_unicode: false,
            export_sigils: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl WriteOptions {
    /// Compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty output with the default indent.
    pub fn pretty() -> Self {
        Self::default().with_pretty(true)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    pub fn with_escape_unicode(mut self, escape_unicode: bool) -> Self {
        self.escape_unicode = escape_unicode;
        self
    }

    pub fn with_export_sigils(mut self, export_sigils: bool) -> Self {
        self.export_sigils = export_sigils;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

struct Writer<'a> {
    out: &'a mut ByteBuffer,
    options: &'a WriteOptions,
}

impl Writer<'_> {
    fn shift(&mut self, level: usize) -> Result<(), WriteError> {
        if self.options.pretty {
            for _ in 0..level * self.options.indent {
                self.out.push(b' ')?;
            }
        }
        Ok(())
    }

    fn pretty_byte(&mut self, byte: u8) -> Result<(), WriteError> {
        if self.options.pretty {
            self.out.push(byte)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value, level: usize) -> Result<(), WriteError> {
        if self.options.export_sigils {
            if value.flags().contains(ExportFlags::BY_REFERENCE) {
                self.out.push(b'&')?;
            }
            if value.flags().contains(ExportFlags::BY_ALIAS) {
                self.out.push(b'@')?;
            }
        }

        match value.kind() {
            ValueKind::Undefined | ValueKind::Null => self.out.append(b"null")?,
            ValueKind::Bool(true) => self.out.append(b"true")?,
            ValueKind::Bool(false) => self.out.append(b"false")?,
            ValueKind::Integer(i) => self.out.append_fmt(format_args!("{i}"))?,
            ValueKind::Float(f) => self.float(*f)?,
            ValueKind::String(s) => self.string(s.as_bytes())?,
            ValueKind::Array(a) => self.array(a, level)?,
            ValueKind::Object(o) => self.object(o, level)?,
        }
        Ok(())
    }

    fn enter(&self, level: usize) -> Result<(), WriteError> {
        if level >= self.options.max_depth {
            log::debug!("refusing to write container at level {}", level);
            return Err(WriteError::TooDeep { depth: level + 1 });
        }
        Ok(())
    }

    fn array(&mut self, array: &Array, level: usize) -> Result<(), WriteError> {
        self.enter(level)?;
        self.out.push(b'[')?;
        let mut written = 0;
        for item in array.iter() {
            if written > 0 {
                self.out.push(b',')?;
            }
            self.pretty_byte(b'\n')?;
            self.shift(level + 1)?;
            self.value(item, level + 1)?;
            written += 1;
        }
        self.close(written, level)?;
        self.out.push(b']')?;
        Ok(())
    }

    fn object(&mut self, object: &Object, level: usize) -> Result<(), WriteError> {
        self.enter(level)?;
        self.out.push(b'{')?;
        let attrs: Vec<&Attribute> = if self.options.sort_keys {
            object.sorted_attributes()
        } else {
            object.iter().filter(|a| !a.value().is_undefined()).collect()
        };
        for (i, attr) in attrs.iter().enumerate() {
            if i > 0 {
                self.out.push(b',')?;
            }
            self.pretty_byte(b'\n')?;
            self.shift(level + 1)?;
            self.string(attr.name().as_bytes())?;
            self.out.push(b':')?;
            self.pretty_byte(b' ')?;
            self.value(attr.value(), level + 1)?;
        }
        self.close(attrs.len(), level)?;
        self.out.push(b'}')?;
        Ok(())
    }

    /// Puts the closing bracket of a non-empty container on its own line.
    fn close(&mut self, written: usize, level: usize) -> Result<(), WriteError> {
        if written > 0 {
            self.pretty_byte(b'\n')?;
            self.shift(level)?;
        }
        Ok(())
    }

    fn float(&mut self, f: f64) -> Result<(), WriteError> {
        if !f.is_finite() {
            self.out.append(b"null")?;
            return Ok(());
        }
        // shortest round-trip text, always with a fraction so it reads back
        // as a float
        let text = format!("{f:?}");
        match text.find('e') {
            Some(e) if !text[..e].contains('.') => {
                self.out.append(text[..e].as_bytes())?;
                self.out.append(b".0")?;
                self.out.append(text[e..].as_bytes())?;
            }
            _ => self.out.append(text.as_bytes())?,
        }
        Ok(())
    }

    fn string(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.out.push(b'"')?;
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if let Some(letter) = unicode::escape_simple(b) {
                self.out.append(&bytes[start..i])?;
                self.out.append(&[b'\\', letter])?;
                i += 1;
                start = i;
            } else if b < 0x20 {
                self.out.append(&bytes[start..i])?;
                self.out.append_fmt(format_args!("\\u{:04x}", b))?;
                i += 1;
                start = i;
            } else if b >= 0x80 && self.options.escape_unicode {
                match unicode::decode_utf8(&bytes[i..]) {
                    Some((ch, width)) => {
                        self.out.append(&bytes[start..i])?;
                        unicode::escape_unicode(ch, &mut *self.out)?;
                        i += width;
                        start = i;
                    }
                    // not UTF-8: copy the byte through
                    None => i += 1,
                }
            } else {
                i += 1;
            }
        }
        self.out.append(&bytes[start..])?;
        self.out.push(b'"')?;
        Ok(())
    }
}

/// Appends the rendering of `value` to `out`.
///
/// A root that is undefined is written as `null`.
pub fn stringify(
    value: &Value,
    options: &WriteOptions,
    out: &mut ByteBuffer,
) -> Result<(), WriteError> {
    Writer { out, options }.value(value, 0)
}

/// Renders `value` into a new buffer.
pub fn to_buffer(value: &Value, options: &WriteOptions) -> Result<ByteBuffer, WriteError> {
    let mut out = ByteBuffer::new();
    stringify(value, options, &mut out)?;
    Ok(out)
}

/// Renders `value` as a `String`. String values that are not valid UTF-8 are
/// converted lossily; use [`to_buffer`] to keep the raw bytes.
pub fn to_string(value: &Value, options: &WriteOptions) -> Result<String, WriteError> {
    Ok(to_buffer(value, options)?.to_string_lossy())
}

/// Renders `value` and writes it to `writer`.
pub fn write_to<W: std::io::Write>(
    value: &Value,
    options: &WriteOptions,
    mut writer: W,
) -> std::io::Result<()> {
    let out = to_buffer(value, options)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(out.as_bytes())
}

/// Renders `value` into the file at `path`, replacing its contents.
pub fn write_file(
    path: impl AsRef<Path>,
    value: &Value,
    options: &WriteOptions,
) -> Result<(), Error> {
    to_buffer(value, options)?.save(path)
}

impl core::fmt::Display for Value {
    /// Compact rendering; `{:#}` renders pretty.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let options = WriteOptions::default().with_pretty(f.alternate());
        let text = to_string(self, &options).map_err(|_| core::fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Array;

    fn sample() -> Value {
        let mut b = Array::new();
        b.push_integer(2).unwrap();
        b.push_integer(3).unwrap();
        let mut o = Object::new();
        o.set_integer(b"a", 1).unwrap();
        o.set(b"b", b.into()).unwrap();
        o.into()
    }

    #[test]
    fn test_compact_output() {
        assert_eq!(
            to_string(&sample(), &WriteOptions::new()).unwrap(),
            r#"{"a":1,"b":[2,3]}"#
        );
    }

    #[test]
    fn test_pretty_output() {
        assert_eq!(
            to_string(&sample(), &WriteOptions::pretty()).unwrap(),
            "{\n  \"a\": 1,\n  \"b\": [\n    2,\n    3\n  ]\n}"
        );
        assert_eq!(
            to_string(&sample(), &WriteOptions::pretty().with_indent(4)).unwrap(),
            "{\n    \"a\": 1,\n    \"b\": [\n        2,\n        3\n    ]\n}"
        );
    }

    #[test]
    fn test_empty_containers() {
        let pretty = WriteOptions::pretty();
        assert_eq!(to_string(&Value::object(), &pretty).unwrap(), "{}");
        assert_eq!(to_string(&Value::array(), &pretty).unwrap(), "[]");
    }

    #[test]
    fn test_undefined_is_skipped() {
        let mut a = Array::new();
        a.set(3, Value::from("x")).unwrap();
        a.push_null().unwrap();
        let mut o = Object::new();
        o.set_undefined(b"gone").unwrap();
        o.set(b"list", a.into()).unwrap();
        assert_eq!(
            to_string(&o.into(), &WriteOptions::new()).unwrap(),
            r#"{"list":["x",null]}"#
        );
        assert_eq!(to_string(&Value::undefined(), &WriteOptions::new()).unwrap(), "null");
    }

    #[test]
    fn test_sorted_keys() {
        let mut o = Object::new();
        o.set_integer(b"zeta", 1).unwrap();
        o.set_integer(b"Alpha", 2).unwrap();
        o.set_integer(b"alpha", 3).unwrap();
        let sorted = WriteOptions::new().with_sort_keys(true);
        assert_eq!(
            to_string(&o.into(), &sorted).unwrap(),
            r#"{"Alpha":2,"alpha":3,"zeta":1}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let s = Value::string(&b"q\"b\\\x08\x0c\n\r\t\x01\x00/"[..]);
        assert_eq!(
            to_string(&s, &WriteOptions::new()).unwrap(),
            r#""q\"b\\\b\f\n\r\t\u0001\u0000/""#
        );
    }

    #[test]
    fn test_unicode_escaping_is_optional() {
        let s = Value::from("é😀");
        assert_eq!(to_string(&s, &WriteOptions::new()).unwrap(), "\"é😀\"");
        let ascii = WriteOptions::new().with_escape_unicode(true);
        assert_eq!(
            to_string(&s, &ascii).unwrap(),
            r#""\u00e9\ud83d\ude00""#
        );
        // bytes that are not UTF-8 pass through untouched
        let raw = Value::string(&b"\xffok"[..]);
        assert_eq!(to_buffer(&raw, &ascii).unwrap().as_bytes(), &b"\"\xffok\""[..]);
    }

    #[test]
    fn test_floats_keep_a_fraction() {
        let w = |f: f64| to_string(&Value::float(f), &WriteOptions::new()).unwrap();
        assert_eq!(w(1.0), "1.0");
        assert_eq!(w(-0.5), "-0.5");
        assert_eq!(w(0.1), "0.1");
        assert_eq!(w(1e300), "1.0e300");
        assert_eq!(w(f64::NAN), "null");
        assert_eq!(w(f64::INFINITY), "null");
    }

    #[test]
    fn test_export_sigils() {
        let v = Value::integer(1).with_flags(ExportFlags::BY_REFERENCE | ExportFlags::BY_ALIAS);
        assert_eq!(to_string(&v, &WriteOptions::new()).unwrap(), "1");
        let export = WriteOptions::new().with_export_sigils(true);
        assert_eq!(to_string(&v, &export).unwrap(), "&@1");
    }

    #[test]
    fn test_depth_limit() {
        let mut v = Value::integer(0);
        for _ in 0..5 {
            let mut a = Array::new();
            a.push(v).unwrap();
            v = a.into();
        }
        assert!(to_string(&v, &WriteOptions::new().with_max_depth(5)).is_ok());
        assert_eq!(
            to_string(&v, &WriteOptions::new().with_max_depth(4)),
            Err(WriteError::TooDeep { depth: 5 })
        );
    }

    #[test]
    fn test_display_and_idempotence() {
        let v = sample();
        assert_eq!(v.to_string(), r#"{"a":1,"b":[2,3]}"#);
        assert_eq!(format!("{v:#}"), to_string(&v, &WriteOptions::pretty()).unwrap());
        let options = WriteOptions::pretty().with_sort_keys(true);
        assert_eq!(to_buffer(&v, &options).unwrap(), to_buffer(&v, &options).unwrap());
    }
}
