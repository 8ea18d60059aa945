//! Custom error types for the dbf-reader crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum DbfError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table file could not be located.
    #[error("could not find file {0:?}")]
    NotFound(PathBuf),

    /// The schema has memo fields but no `.fpt` / `.dbt` file sits next to the table.
    #[error("missing memo file for {0:?}")]
    MissingMemo(PathBuf),

    /// A field descriptor carries a type tag with no decoder.
    #[error("Unknown field type: {tag:?} (field {field})")]
    UnsupportedFieldType { field: String, tag: char },

    /// A fixed-width field type was declared with the wrong length.
    #[error("Field type {tag} must have length {expected} (was {found}) in field {field}")]
    MalformedFieldLength {
        field: String,
        tag: char,
        expected: u16,
        found: u16,
    },

    /// A field's raw bytes do not follow the grammar of its type.
    #[error("Invalid value in field {field}: {message}")]
    Decode { field: String, message: String },

    /// A memo block ended before its declared payload length.
    #[error("EOF reached while reading memo {index}: expected {expected} bytes, got {found}")]
    MemoRead {
        index: u64,
        expected: u64,
        found: u64,
    },

    /// A buffer has an unexpected size for the structure being decoded.
    #[error("Size mismatch for {context}: expected {expected} bytes, but found {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// An explicitly requested text encoding is not known.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// The file is structurally invalid.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl DbfError {
    pub(crate) fn decode(field: &str, message: impl Into<String>) -> Self {
        DbfError::Decode {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A convenience `Result` type alias using the crate's `DbfError` type.
pub type Result<T> = std::result::Result<T, DbfError>;
