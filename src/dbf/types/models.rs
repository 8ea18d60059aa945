//! Core data structures for DBF tables.
//!
//! - The fixed table header and the field descriptors that form the schema
//! - Decoded field values and memo payloads
//! - Record status markers

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

/// The 32-byte header at the start of every DBF file.
///
/// Only the version, date, counts, lengths and language driver are
/// interpreted; the remaining bytes are kept for completeness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u8,
    /// Two-digit year of last modification. See [`expand_year`](crate::dbf::format::header::expand_year).
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub num_records: u32,
    /// Offset of the first record in the file.
    pub header_len: u16,
    /// Length of one record including its marker byte.
    pub record_len: u16,
    pub reserved1: u16,
    pub incomplete_transaction: u8,
    pub encryption_flag: u8,
    pub free_record_thread: u32,
    pub reserved2: u32,
    pub reserved3: u32,
    pub mdx_flag: u8,
    pub language_driver: u8,
    pub reserved4: u16,
}

/// One entry of the schema, decoded from a 32-byte field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// One-character type tag, e.g. `C`, `N`, `D`.
    pub field_type: char,
    /// Offset of the field inside a record. Informational only.
    pub address: u32,
    /// Declared length in bytes. For `C` fields this already includes the
    /// high byte stored in the decimal count.
    pub length: u16,
    /// Decimal places for numeric types; always 0 for `C` fields.
    pub decimal_count: u8,
    pub reserved1: u16,
    pub workarea_id: u8,
    pub reserved2: u8,
    pub reserved3: u8,
    pub set_fields_flag: u8,
    pub reserved4: [u8; 7],
    pub index_field_flag: u8,
}

impl FieldDescriptor {
    /// Whether values of this field live in the memo file.
    ///
    /// `B` is included regardless of version: in Visual FoxPro it is a double,
    /// but a table carrying it still expects a memo file next to it.
    pub fn is_memo(&self) -> bool {
        matches!(self.field_type, 'M' | 'G' | 'P' | 'B')
    }
}

/// The record status byte preceding every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Active,
    Deleted,
}

impl Marker {
    pub fn byte(self) -> u8 {
        match self {
            Marker::Active => b' ',
            Marker::Deleted => b'*',
        }
    }
}

/// Marks the end of the record area.
pub const END_OF_RECORDS: u8 = 0x1A;

/// The kind of content stored in a memo block.
///
/// Visual FoxPro tags every block; dBase III and IV memo files have no tag
/// and produce [`MemoKind::Plain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoKind {
    Picture,
    Text,
    Object,
    Binary,
    Plain,
}

impl MemoKind {
    /// Maps the type word of a Visual FoxPro memo block.
    pub fn from_vfp_type(value: u32) -> Self {
        match value {
            0 => MemoKind::Picture,
            1 => MemoKind::Text,
            2 => MemoKind::Object,
            _ => MemoKind::Binary,
        }
    }

    /// Binary memos are never decoded as text, even in `M` fields.
    pub fn is_binary(self) -> bool {
        matches!(self, MemoKind::Picture | MemoKind::Object | MemoKind::Binary)
    }
}

/// A memo payload as read from the memo file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo {
    pub kind: MemoKind,
    pub data: Vec<u8>,
}

impl Memo {
    pub fn new(kind: MemoKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Currency(BigDecimal),
    /// Raw bytes: `0` flag fields, and every field in raw mode.
    Bytes(Vec<u8>),
    Memo(Memo),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(text) => write!(f, "{:?}", text),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Date(date) => write!(f, "{}", date),
            Value::DateTime(datetime) => write!(f, "{}", datetime),
            Value::Currency(value) => write!(f, "{}", value),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Memo(memo) => write!(f, "<{:?} memo, {} bytes>", memo.kind, memo.data.len()),
        }
    }
}
