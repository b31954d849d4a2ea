// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Raised when a buffer, slot array or hash table would have to grow past its
/// hard ceiling, or when the allocator refuses the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// The number of units (bytes or slots) that was asked for.
    pub requested: usize,
    /// The ceiling of the structure that refused the request.
    pub limit: usize,
}

impl CapacityError {
    pub(crate) fn new(requested: usize, limit: usize) -> Self {
        Self { requested, limit }
    }
}

impl core::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "capacity exceeded: requested {} (limit {})",
            self.requested, self.limit
        )
    }
}

impl std::error::Error for CapacityError {}

/// What went wrong while scanning or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input ended in the middle of a production.
    UnexpectedEof,
    /// A backslash escape was malformed or named an invalid code point.
    BadEscape,
    /// An opening delimiter was never matched by its closer.
    NotClosed(u8),
    /// An attribute or section name was missing or malformed.
    BadName,
    /// A separator character was expected but something else was found.
    Expected(u8),
    /// Containers were nested deeper than the configured limit.
    TooDeep,
    /// Building the tree hit a capacity ceiling.
    Capacity,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ErrorKind::UnexpectedEof => write!(f, "Unexpected EOF"),
            ErrorKind::BadEscape => write!(f, "Bad escape sequence"),
            ErrorKind::NotClosed(c) => write!(f, "'{}' not closed", *c as char),
            ErrorKind::BadName => write!(f, "Bad name"),
            ErrorKind::Expected(c) => write!(f, "'{}' expected", *c as char),
            ErrorKind::TooDeep => write!(f, "Too deeply nested"),
            ErrorKind::Capacity => write!(f, "Capacity exceeded"),
        }
    }
}

/// The first error hit by a parse, with the 0-based line it occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    kind: ErrorKind,
    line: u32,
}

impl ParseError {
    pub fn new(kind: ErrorKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 0-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based line number, as shown in diagnostics.
    pub fn display_line(&self) -> u32 {
        self.line.saturating_add(1)
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ERROR: {} (line {})", self.kind, self.display_line())
    }
}

impl std::error::Error for ParseError {}

/// Errors raised while rendering a tree to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The tree is nested deeper than `WriteOptions::max_depth`.
    TooDeep { depth: usize },
    /// The output buffer hit its ceiling.
    Capacity(CapacityError),
}

impl From<CapacityError> for WriteError {
    fn from(err: CapacityError) -> Self {
        WriteError::Capacity(err)
    }
}

impl core::fmt::Display for WriteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WriteError::TooDeep { depth } => write!(f, "too deeply nested (level {depth})"),
            WriteError::Capacity(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Errors returned by the file-level entry points.
#[derive(Debug)]
pub enum Error {
    /// The document could not be parsed.
    Parse(ParseError),
    /// Reading or writing `path` failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A buffer hit its ceiling.
    Capacity(CapacityError),
    /// The tree could not be rendered.
    Write(WriteError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<CapacityError> for Error {
    fn from(err: CapacityError) -> Self {
        Error::Capacity(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Self {
        Error::Write(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{e}"),
            Error::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Error::Capacity(e) => write!(f, "{e}"),
            Error::Write(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Io { source, .. } => Some(source),
            Error::Capacity(e) => Some(e),
            Error::Write(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_line_is_one_based() {
        let err = ParseError::new(ErrorKind::UnexpectedEof, 0);
        assert_eq!(err.to_string(), "ERROR: Unexpected EOF (line 1)");
        let err = ParseError::new(ErrorKind::NotClosed(b'{'), 4);
        assert_eq!(err.to_string(), "ERROR: '{' not closed (line 5)");
        let err = ParseError::new(ErrorKind::Expected(b':'), 2);
        assert_eq!(err.to_string(), "ERROR: ':' expected (line 3)");
    }

    #[test]
    fn test_error_conversions() {
        // Parse errors keep their kind through the crate-level error
        let error: Error = ParseError::new(ErrorKind::BadName, 7).into();
        match error {
            Error::Parse(e) => {
                assert_eq!(e.kind(), ErrorKind::BadName);
                assert_eq!(e.display_line(), 8);
            }
            _ => panic!("Expected Parse error"),
        }

        let error: WriteError = CapacityError::new(10, 4).into();
        assert_eq!(error, WriteError::Capacity(CapacityError::new(10, 4)));
    }

    #[test]
    fn test_io_error_mentions_path() {
        let error = Error::io(
            "missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(error.to_string().starts_with("missing.json: "));
    }
}
