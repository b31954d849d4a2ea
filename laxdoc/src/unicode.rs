// SPDX-License-Identifier: Apache-2.0

//! Escape sequence and UTF-8 helpers shared by the lexer and the writer.

use crate::byte_buffer::ByteBuffer;
use crate::parse_error::{CapacityError, ErrorKind};

/// Maps the character after a backslash to the byte it stands for.
///
/// `u` is not handled here, see [`unescape_unicode`].
pub fn unescape_simple(escape_char: u8) -> Option<u8> {
    match escape_char {
        b'"' => Some(b'"'),
        b'\\' => Some(b'\\'),
        b'/' => Some(b'/'),
        b'b' => Some(0x08),
        b'f' => Some(0x0C),
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        _ => None,
    }
}

/// The shorthand letter a byte is written as inside a quoted string, if any.
pub fn escape_simple(byte: u8) -> Option<u8> {
    match byte {
        b'"' => Some(b'"'),
        b'\\' => Some(b'\\'),
        0x08 => Some(b'b'),
        0x0C => Some(b'f'),
        b'\n' => Some(b'n'),
        b'\r' => Some(b'r'),
        b'\t' => Some(b't'),
        _ => None,
    }
}

pub fn hex_digit(byte: u8) -> Option<u32> {
    match byte {
        b'0'..=b'9' => Some(u32::from(byte - b'0')),
        b'a'..=b'f' => Some(u32::from(byte - b'a') + 10),
        b'A'..=b'F' => Some(u32::from(byte - b'A') + 10),
        _ => None,
    }
}

/// Check if a code unit is a high surrogate (0xD800-0xDBFF)
pub fn is_high_surrogate(unit: u32) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// Check if a code unit is a low surrogate (0xDC00-0xDFFF)
pub fn is_low_surrogate(unit: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Combines a UTF-16 surrogate pair into a code point.
pub fn combine_surrogate_pair(high: u32, low: u32) -> Option<char> {
    if !is_high_surrogate(high) || !is_low_surrogate(low) {
        return None;
    }
    char::from_u32(0x10000 + ((high & 0x3FF) << 10) + (low & 0x3FF))
}

/// Reads a `\uXXXX` sequence at the start of `input`.
fn read_u_escape(input: &[u8]) -> Option<u32> {
    match input {
        [b'\\', b'u', digits @ ..] if digits.len() >= 4 => digits[..4]
            .iter()
            .try_fold(0u32, |n, &b| Some((n << 4) | hex_digit(b)?)),
        _ => None,
    }
}

/// Decodes a `\uXXXX` escape, or a `\uXXXX\uXXXX` surrogate pair, at the
/// start of `input` (which begins with the backslash).
///
/// Returns the character and the number of input bytes it spans (6 or 12).
/// Truncated sequences, bad hex digits and unpaired surrogates are
/// [`ErrorKind::BadEscape`].
pub fn unescape_unicode(input: &[u8]) -> Result<(char, usize), ErrorKind> {
    let unit = read_u_escape(input).ok_or(ErrorKind::BadEscape)?;
    if is_high_surrogate(unit) {
        let low = read_u_escape(&input[6..]).ok_or(ErrorKind::BadEscape)?;
        let ch = combine_surrogate_pair(unit, low).ok_or(ErrorKind::BadEscape)?;
        return Ok((ch, 12));
    }
    let ch = char::from_u32(unit).ok_or(ErrorKind::BadEscape)?;
    Ok((ch, 6))
}

/// Appends `ch` as `\uxxxx`, or as a surrogate pair outside the BMP.
pub fn escape_unicode(ch: char, out: &mut ByteBuffer) -> Result<(), CapacityError> {
    let mut units = [0u16; 2];
    for unit in ch.encode_utf16(&mut units) {
        out.append_fmt(format_args!("\\u{:04x}", unit))?;
    }
    Ok(())
}

/// Decodes one UTF-8 sequence from the start of `bytes`.
///
/// Overlong forms, encoded surrogates, code points past U+10FFFF and
/// truncated sequences are rejected.
pub fn decode_utf8(bytes: &[u8]) -> Option<(char, usize)> {
    let lead = *bytes.first()?;
    let width = match lead {
        0x00..=0x7F => return Some((char::from(lead), 1)),
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return None,
    };
    let tail = bytes.get(1..width)?;
    if tail.iter().any(|b| b & 0xC0 != 0x80) {
        return None;
    }
    let mask = [0, 0, 0x1F, 0x0F, 0x07][width];
    let cp = tail
        .iter()
        .fold(u32::from(lead & mask), |cp, b| (cp << 6) | u32::from(b & 0x3F));
    let min = [0, 0, 0x80, 0x800, 0x10000][width];
    if cp < min {
        return None;
    }
    char::from_u32(cp).map(|ch| (ch, width))
}
