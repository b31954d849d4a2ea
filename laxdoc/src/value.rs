// SPDX-License-Identifier: Apache-2.0

//! The mutable document tree.
//!
//! A [`Value`] is a [`ValueKind`] plus the source line it was parsed from and
//! a small set of [`ExportFlags`]. Containers own their children outright;
//! replacing or removing a child drops it.
//!
//! [`ValueKind::Undefined`] is a placeholder. It fills array holes left by
//! auto-growth, is skipped by the writer and is treated as "not there" by
//! path selection.

use crate::byte_buffer::ByteBuffer;
use crate::hash_table::HashTable;
use crate::parse_error::CapacityError;
use crate::slot_array::SlotArray;

/// Returned by the integer accessors when the key or path does not exist.
pub const MISSING_INTEGER: i64 = i64::MIN;

/// Hash index slots allocated by an object's first insert.
const INDEX_CAPACITY: u32 = 8;

/// Per-node export markers, emitted as sigils when
/// [`WriteOptions::export_sigils`](crate::WriteOptions) is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportFlags(u8);

impl ExportFlags {
    /// Written as `&`.
    pub const BY_REFERENCE: ExportFlags = ExportFlags(1);
    /// Written as `@`.
    pub const BY_ALIAS: ExportFlags = ExportFlags(2);

    pub const fn empty() -> Self {
        ExportFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: ExportFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ExportFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ExportFlags) {
        self.0 &= !other.0;
    }
}

impl core::ops::BitOr for ExportFlags {
    type Output = ExportFlags;

    fn bitor(self, rhs: ExportFlags) -> ExportFlags {
        ExportFlags(self.0 | rhs.0)
    }
}

/// The type tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Float => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl core::fmt::Display for ValueType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueKind {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(ByteBuffer),
    Array(Array),
    Object(Object),
}

/// A node of the document tree.
///
/// Equality compares content only; source lines and export flags are
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct Value {
    kind: ValueKind,
    line: u32,
    flags: ExportFlags,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            line: 0,
            flags: ExportFlags::empty(),
        }
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn bool(b: bool) -> Self {
        Self::new(ValueKind::Bool(b))
    }

    pub fn integer(i: i64) -> Self {
        Self::new(ValueKind::Integer(i))
    }

    pub fn float(f: f64) -> Self {
        Self::new(ValueKind::Float(f))
    }

    pub fn string(s: impl Into<ByteBuffer>) -> Self {
        Self::new(ValueKind::String(s.into()))
    }

    pub fn array() -> Self {
        Self::new(ValueKind::Array(Array::new()))
    }

    pub fn object() -> Self {
        Self::new(ValueKind::Object(Object::new()))
    }

    /// Sets the 0-based source line.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_flags(mut self, flags: ExportFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ValueKind {
        &mut self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    /// 0-based line the value started on, 0 for values built in code.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn flags(&self) -> ExportFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut ExportFlags {
        &mut self.flags
    }

    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            ValueKind::Undefined => ValueType::Undefined,
            ValueKind::Null => ValueType::Null,
            ValueKind::Bool(_) => ValueType::Bool,
            ValueKind::Integer(_) => ValueType::Integer,
            ValueKind::Float(_) => ValueType::Float,
            ValueKind::String(_) => ValueType::String,
            ValueKind::Array(_) => ValueType::Array,
            ValueKind::Object(_) => ValueType::Object,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, ValueKind::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&ByteBuffer> {
        match &self.kind {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_buffer().map(ByteBuffer::as_bytes)
    }

    /// The string content, if this is a string holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_buffer().and_then(|s| s.to_str().ok())
    }

    pub fn as_array(&self) -> Option<&Array> {
        match &self.kind {
            ValueKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match &mut self.kind {
            ValueKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match &self.kind {
            ValueKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match &mut self.kind {
            ValueKind::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Numeric value as `f64`; 0 for anything that is not a number.
    pub fn cast_f64(&self) -> f64 {
        match self.kind {
            ValueKind::Integer(i) => i as f64,
            ValueKind::Float(f) => f,
            _ => 0.0,
        }
    }

    /// Numeric value as `i64` (floats truncate); 0 for anything that is not
    /// a number.
    pub fn cast_i64(&self) -> i64 {
        match self.kind {
            ValueKind::Integer(i) => i,
            ValueKind::Float(f) => f as i64,
            _ => 0,
        }
    }

    /// Walks a path of object keys separated by `.` or `/`.
    ///
    /// Returns `None` as soon as a level is not an object or a key is missing
    /// or holds an undefined value. Nothing is created along the way.
    pub fn select(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        path.split(['.', '/'])
            .try_fold(self, |current, key| current.as_object()?.get(key.as_bytes()))
    }

    pub fn select_mut(&mut self, path: &str) -> Option<&mut Value> {
        if path.is_empty() {
            return None;
        }
        path.split(['.', '/'])
            .try_fold(self, |current, key| current.as_object_mut()?.get_mut(key.as_bytes()))
    }

    /// Integer at `path`, or [`MISSING_INTEGER`] if nothing is there.
    ///
    /// # Panics
    /// If the selected value is not an integer.
    pub fn select_integer(&self, path: &str) -> i64 {
        match self.select(path) {
            None => MISSING_INTEGER,
            Some(value) => match value.kind {
                ValueKind::Integer(i) => i,
                _ => panic!("`{}` is {}, not integer", path, value.value_type()),
            },
        }
    }

    /// String bytes at `path`.
    ///
    /// # Panics
    /// If the selected value is not a string.
    pub fn select_string(&self, path: &str) -> Option<&[u8]> {
        let value = self.select(path)?;
        match &value.kind {
            ValueKind::String(s) => Some(s.as_bytes()),
            _ => panic!("`{}` is {}, not string", path, value.value_type()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::new(ValueKind::Array(a))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::new(ValueKind::Object(o))
    }
}

/// An ordered list of values that may contain undefined holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    items: SlotArray<Value>,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, holes included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of slots holding something other than undefined.
    pub fn defined_len(&self) -> usize {
        self.iter().count()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    /// The slot at `index`, growing the array with undefined holes if needed.
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut Value, CapacityError> {
        self.items.slot_mut(index)
    }

    pub fn push(&mut self, value: Value) -> Result<(), CapacityError> {
        self.items.push(value)
    }

    pub fn push_null(&mut self) -> Result<(), CapacityError> {
        self.push(Value::null())
    }

    pub fn push_bool(&mut self, b: bool) -> Result<(), CapacityError> {
        self.push(Value::bool(b))
    }

    pub fn push_integer(&mut self, i: i64) -> Result<(), CapacityError> {
        self.push(Value::integer(i))
    }

    pub fn push_float(&mut self, f: f64) -> Result<(), CapacityError> {
        self.push(Value::float(f))
    }

    pub fn push_string(&mut self, s: &[u8]) -> Result<(), CapacityError> {
        self.push(Value::string(ByteBuffer::from_slice(s)?))
    }

    /// Stores `value` at `index`, back-filling with undefined holes. Returns
    /// the previous occupant.
    pub fn set(&mut self, index: usize, value: Value) -> Result<Value, CapacityError> {
        self.items.set(index, value)
    }

    pub fn insert(&mut self, index: usize, value: Value) -> Result<(), CapacityError> {
        self.items.insert(index, value)
    }

    /// Removes the slot at `index` and closes the gap.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Defined values, holes skipped.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().filter(|v| !v.is_undefined())
    }

    /// Every slot, holes included.
    pub fn slots(&self) -> &[Value] {
        self.items.as_slice()
    }

    /// Defined values, holes skipped.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.items.iter_mut().filter(|v| !v.is_undefined())
    }
}

impl FromIterator<Value> for Array {
    /// Collects values into an array.
    ///
    /// # Panics
    /// If the array would exceed its slot ceiling.
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut array = Array::new();
        for value in iter {
            if let Err(e) = array.push(value) {
                panic!("{e}");
            }
        }
        array
    }
}

/// A named member of an object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attribute {
    name: ByteBuffer,
    value: Value,
}

impl Attribute {
    pub fn name(&self) -> &ByteBuffer {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }
}

/// Attributes in first-insertion order, indexed by name.
///
/// Re-setting an existing key replaces its value in place. Removing a key and
/// setting it again moves it to the end.
#[derive(Debug, Clone, Default)]
pub struct Object {
    attrs: SlotArray<Attribute>,
    /// Key to position in `attrs`, created by the first insert.
    index: Option<HashTable<Box<[u8]>, usize>>,
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes, including those holding undefined.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    fn position(&self, key: &[u8]) -> Option<usize> {
        self.index.as_ref()?.get(key).copied()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.position(key).is_some()
    }

    pub fn attribute(&self, key: &[u8]) -> Option<&Attribute> {
        self.attrs.get(self.position(key)?)
    }

    /// The value stored under `key`. Undefined values count as absent.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.attribute(key)
            .map(Attribute::value)
            .filter(|v| !v.is_undefined())
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        let pos = self.position(key)?;
        self.attrs
            .get_mut(pos)
            .map(Attribute::value_mut)
            .filter(|v| !v.is_undefined())
    }

    /// Inserts or replaces. A replaced value is returned and keeps its
    /// position; a new key goes to the end.
    pub fn set(&mut self, key: &[u8], value: Value) -> Result<Option<Value>, CapacityError> {
        if let Some(pos) = self.position(key) {
            if let Some(attr) = self.attrs.get_mut(pos) {
                return Ok(Some(core::mem::replace(&mut attr.value, value)));
            }
        }

        if self.index.is_none() {
            self.index = Some(HashTable::new(INDEX_CAPACITY)?);
        }
        let attr = Attribute {
            name: ByteBuffer::from_slice(key)?,
            value,
        };
        let pos = self.attrs.len();
        if let Some(index) = self.index.as_mut() {
            index.put(Box::from(key), pos)?;
            if let Err(e) = self.attrs.push(attr) {
                index.remove(key);
                return Err(e);
            }
        }
        Ok(None)
    }

    pub fn set_undefined(&mut self, key: &[u8]) -> Result<(), CapacityError> {
        self.set(key, Value::undefined()).map(drop)
    }

    pub fn set_null(&mut self, key: &[u8]) -> Result<(), CapacityError> {
        self.set(key, Value::null()).map(drop)
    }

    pub fn set_bool(&mut self, key: &[u8], b: bool) -> Result<(), CapacityError> {
        self.set(key, Value::bool(b)).map(drop)
    }

    pub fn set_integer(&mut self, key: &[u8], i: i64) -> Result<(), CapacityError> {
        self.set(key, Value::integer(i)).map(drop)
    }

    pub fn set_float(&mut self, key: &[u8], f: f64) -> Result<(), CapacityError> {
        self.set(key, Value::float(f)).map(drop)
    }

    /// Stores a copy of `s`, or null when `s` is `None`.
    pub fn set_string(&mut self, key: &[u8], s: Option<&[u8]>) -> Result<(), CapacityError> {
        let value = match s {
            Some(s) => Value::string(ByteBuffer::from_slice(s)?),
            None => Value::null(),
        };
        self.set(key, value).map(drop)
    }

    /// Stores a copy of the buffer, or null when `buffer` is `None`.
    pub fn set_buffer(
        &mut self,
        key: &[u8],
        buffer: Option<&ByteBuffer>,
    ) -> Result<(), CapacityError> {
        self.set_string(key, buffer.map(ByteBuffer::as_bytes))
    }

    /// Removes `key`, returning its value. Missing keys are a no-op.
    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        let index = self.index.as_mut()?;
        let (_, pos) = index.remove(key)?;
        let attr = self.attrs.remove(pos);
        for (i, later) in self.attrs.iter().enumerate().skip(pos) {
            if let Some(slot) = index.get_mut(later.name.as_bytes()) {
                *slot = i;
            }
        }
        Some(attr.value)
    }

    pub fn clear(&mut self) {
        self.attrs.clear();
        self.index = None;
    }

    /// Attributes in insertion order, undefined values included.
    pub fn iter(&self) -> core::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.attrs.iter().map(|a| a.name.as_bytes())
    }

    /// Attributes with defined values, sorted by key bytes.
    pub fn sorted_attributes(&self) -> Vec<&Attribute> {
        let mut sorted: Vec<&Attribute> =
            self.attrs.iter().filter(|a| !a.value.is_undefined()).collect();
        sorted.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        sorted
    }

    /// Integer under `key`: [`MISSING_INTEGER`] if absent, 0 if null.
    ///
    /// # Panics
    /// If the value is neither null nor an integer.
    pub fn get_integer(&self, key: &[u8]) -> i64 {
        match self.get(key) {
            None => MISSING_INTEGER,
            Some(value) => match value.kind {
                ValueKind::Null => 0,
                ValueKind::Integer(i) => i,
                _ => panic!(
                    "attribute {:?} is {}, not integer",
                    String::from_utf8_lossy(key),
                    value.value_type()
                ),
            },
        }
    }

    /// String bytes under `key`; `None` if absent or null.
    ///
    /// # Panics
    /// If the value is neither null nor a string.
    pub fn get_string(&self, key: &[u8]) -> Option<&[u8]> {
        let value = self.get(key)?;
        match &value.kind {
            ValueKind::Null => None,
            ValueKind::String(s) => Some(s.as_bytes()),
            _ => panic!(
                "attribute {:?} is {}, not string",
                String::from_utf8_lossy(key),
                value.value_type()
            ),
        }
    }

    /// # Panics
    /// If the value is not an object.
    pub fn get_object(&self, key: &[u8]) -> Option<&Object> {
        let value = self.get(key)?;
        match value.as_object() {
            Some(o) => Some(o),
            None => panic!(
                "attribute {:?} is {}, not object",
                String::from_utf8_lossy(key),
                value.value_type()
            ),
        }
    }

    /// # Panics
    /// If the value is not an array.
    pub fn get_array(&self, key: &[u8]) -> Option<&Array> {
        let value = self.get(key)?;
        match value.as_array() {
            Some(a) => Some(a),
            None => panic!(
                "attribute {:?} is {}, not array",
                String::from_utf8_lossy(key),
                value.value_type()
            ),
        }
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a Attribute;
    type IntoIter = core::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
