// SPDX-License-Identifier: Apache-2.0

//! A forgiving reader and writer for JSON-family and INI documents.
//!
//! Documents parse into a mutable [`Value`] tree. Objects keep their keys in
//! insertion order and index them through a coalesced-chaining
//! [`HashTable`]; arrays may hold undefined holes. The tree serializes back
//! to strict JSON.
//!
//! ```
//! let root = laxdoc::parse("{ name: 'demo', ports: (80 443) }").unwrap();
//! assert_eq!(root.select_string("name"), Some(&b"demo"[..]));
//! assert_eq!(root.select_integer("missing"), laxdoc::MISSING_INTEGER);
//! assert_eq!(root.to_string(), r#"{"name":"demo","ports":[80,443]}"#);
//! ```

mod byte_buffer;
pub use byte_buffer::{ByteBuffer, BLOCK_SIZE, MAX_BYTES};

mod slot_array;
pub use slot_array::{SlotArray, MAX_SLOTS};

pub mod hash_table;
pub use hash_table::{CaselessFnv1a, Fnv1a, HashTable, KeyStrategy};

mod parse_error;
pub use parse_error::{CapacityError, Error, ErrorKind, ParseError, WriteError};

mod unicode;

mod value;
pub use value::{
    Array, Attribute, ExportFlags, Object, Value, ValueKind, ValueType, MISSING_INTEGER,
};

mod writer;
pub use writer::{
    stringify, to_buffer, to_string, write_file, write_to, WriteOptions, DEFAULT_MAX_DEPTH,
};

mod lexer;

mod parser;
pub use parser::{parse, parse_file, parse_file_with, parse_with, ParseOptions, Parsed, Trailing};

mod ini;
pub use ini::{parse_ini, parse_ini_file};

mod stats;
pub use stats::{collect_key_stats, KeyStats, PathStats};
