// SPDX-License-Identifier: Apache-2.0

//! Growable, always NUL-terminated byte buffer.
//!
//! Backs string values and every text-building operation in the crate:
//! escaping, formatting, file load and save.

use std::path::Path;

use crate::parse_error::{CapacityError, Error};

/// Allocation granularity in bytes.
pub const BLOCK_SIZE: usize = 32;
/// Hard ceiling for a single buffer (512 MiB), terminator included.
pub const MAX_BYTES: usize = 536_870_912;

/// A length-tracked byte string that always keeps a trailing NUL once it has
/// been written to.
///
/// Content is raw bytes; it is not required to be valid UTF-8.
#[derive(Clone, Default)]
pub struct ByteBuffer {
    /// Content followed by one NUL byte, or empty if nothing was ever written.
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates an empty buffer without allocating.
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Creates an empty buffer able to hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        let mut buffer = Self::new();
        buffer.reserve_total(capacity.saturating_add(1))?;
        buffer.data.push(0);
        Ok(buffer)
    }

    /// Copies `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CapacityError> {
        let mut buffer = Self::new();
        buffer.append(bytes)?;
        Ok(buffer)
    }

    /// Number of content bytes (terminator excluded).
    pub fn len(&self) -> usize {
        self.data.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be held before the next allocation, terminator excluded.
    pub fn capacity(&self) -> usize {
        self.data.capacity().saturating_sub(1)
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.data.split_last() {
            Some((_, content)) => content,
            None => &[],
        }
    }

    /// Content plus the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if self.data.is_empty() {
            b"\0"
        } else {
            &self.data
        }
    }

    /// Content as UTF-8, if it is valid.
    pub fn to_str(&self) -> Result<&str, core::str::Utf8Error> {
        core::str::from_utf8(self.as_bytes())
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn last_byte(&self) -> Option<u8> {
        self.as_bytes().last().copied()
    }

    /// Ensures room for `total` bytes (content plus terminator).
    ///
    /// Capacity rounds up to [`BLOCK_SIZE`] and at least doubles on growth,
    /// bounded by [`MAX_BYTES`].
    fn reserve_total(&mut self, total: usize) -> Result<(), CapacityError> {
        if self.data.capacity() >= total {
            return Ok(());
        }
        let rounded = total
            .checked_next_multiple_of(BLOCK_SIZE)
            .ok_or(CapacityError::new(total, MAX_BYTES))?;
        if rounded > MAX_BYTES {
            return Err(CapacityError::new(total, MAX_BYTES));
        }
        let doubled = self.data.capacity().saturating_mul(2).min(MAX_BYTES);
        let target = rounded.max(doubled);
        self.data
            .try_reserve_exact(target.saturating_sub(self.data.len()))
            .map_err(|_| CapacityError::new(total, MAX_BYTES))
    }

    /// Appends raw bytes.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), CapacityError> {
        let len = self.len();
        let total = len
            .checked_add(bytes.len())
            .and_then(|n| n.checked_add(1))
            .ok_or(CapacityError::new(usize::MAX, MAX_BYTES))?;
        self.reserve_total(total)?;
        self.data.truncate(len);
        self.data.extend_from_slice(bytes);
        self.data.push(0);
        Ok(())
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) -> Result<(), CapacityError> {
        self.append(&[byte])
    }

    /// Appends formatted text, e.g. `buf.append_fmt(format_args!("{n}"))`.
    pub fn append_fmt(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), CapacityError> {
        match args.as_str() {
            Some(s) => self.append(s.as_bytes()),
            None => self.append(args.to_string().as_bytes()),
        }
    }

    /// Sets the length to zero, keeping the allocation.
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.data.truncate(1);
            self.data[0] = 0;
        }
    }

    /// Truncates or zero-extends the content to exactly `size` bytes.
    pub fn resize(&mut self, size: usize) -> Result<(), CapacityError> {
        self.reserve_total(size.saturating_add(1))?;
        let len = self.len();
        self.data.truncate(len);
        self.data.resize(size, 0);
        self.data.push(0);
        Ok(())
    }

    /// Drops the first `n` bytes.
    ///
    /// # Panics
    /// If `n` is larger than the content length.
    pub fn shift(&mut self, n: usize) {
        assert!(n <= self.len(), "shift past end of buffer");
        if n > 0 {
            self.data.drain(..n);
        }
    }

    pub fn lstrip(&mut self) {
        let n = self
            .as_bytes()
            .iter()
            .take_while(|&&c| is_strip_space(c))
            .count();
        self.shift(n);
    }

    pub fn rstrip(&mut self) {
        let n = self
            .as_bytes()
            .iter()
            .rev()
            .take_while(|&&c| is_strip_space(c))
            .count();
        if n > 0 {
            let len = self.len() - n;
            self.data.truncate(len);
            self.data.push(0);
        }
    }

    pub fn strip(&mut self) {
        self.lstrip();
        self.rstrip();
    }

    /// Appends `s` as a single-quoted SQL literal, escaping the characters
    /// MySQL's `mysql_real_escape_string` escapes.
    pub fn sql_quote(&mut self, s: &[u8]) -> Result<(), CapacityError> {
        self.reserve_total(self.len() + 2 * s.len() + 3)?;
        self.push(b'\'')?;
        for &c in s {
            match sql_escape(c) {
                Some(e) => self.append(&[b'\\', e])?,
                None => self.push(c)?,
            }
        }
        self.push(b'\'')
    }

    /// Appends `s` with line breaks, tabs, backslashes and NULs escaped so
    /// it stays on one log line.
    pub fn log_quote(&mut self, s: &[u8]) -> Result<(), CapacityError> {
        self.reserve_total(self.len() + 2 * s.len() + 1)?;
        for &c in s {
            let escape = match c {
                0 => Some(b'0'),
                b'\n' => Some(b'n'),
                b'\r' => Some(b'r'),
                b'\\' => Some(b'\\'),
                b'\t' => Some(b't'),
                0x1a => Some(b'Z'),
                _ => None,
            };
            match escape {
                Some(e) => self.append(&[b'\\', e])?,
                None => self.push(c)?,
            }
        }
        Ok(())
    }

    /// Replaces the content with the whole of `path`.
    ///
    /// On failure the buffer is left untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let mut loaded = Self::new();
        loaded.reserve_total(bytes.len().saturating_add(1))?;
        loaded.data.extend_from_slice(&bytes);
        loaded.data.push(0);
        log::debug!("loaded {} bytes from {}", loaded.len(), path.display());
        *self = loaded;
        Ok(())
    }

    /// Writes the content (terminator excluded) to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        std::fs::write(path, self.as_bytes()).map_err(|e| Error::io(path, e))?;
        log::debug!("saved {} bytes to {}", self.len(), path.display());
        Ok(())
    }
}

fn is_strip_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

fn sql_escape(c: u8) -> Option<u8> {
    match c {
        0 => Some(b'0'),
        b'\n' => Some(b'n'),
        b'\r' => Some(b'r'),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        0x1a => Some(b'Z'),
        _ => None,
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() + 1);
        data.extend_from_slice(bytes);
        data.push(0);
        Self { data }
    }
}

impl From<&str> for ByteBuffer {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(mut data: Vec<u8>) -> Self {
        data.push(0);
        Self { data }
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ByteBuffer {}

impl PartialEq<[u8]> for ByteBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&str> for ByteBuffer {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl core::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl core::fmt::Write for ByteBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.append(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}
