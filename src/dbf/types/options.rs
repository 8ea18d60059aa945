//! Options controlling how a table is opened and decoded.

use std::collections::HashMap;

use super::encoding::CharDecodeErrors;
use crate::dbf::format::fields::DecodeFn;

/// Configuration for [`DbfTable`](crate::DbfTable).
///
/// ```
/// use dbf_reader::{CharDecodeErrors, TableOptions};
///
/// let options = TableOptions::default()
///     .with_encoding("cp1252")
///     .with_lowercase_names(true)
///     .with_char_decode_errors(CharDecodeErrors::Replace);
/// assert!(options.ignore_case);
/// ```
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Encoding label overriding the header's language driver.
    pub encoding: Option<String>,
    /// Resolve the table path case-insensitively.
    pub ignore_case: bool,
    /// Lower-case field names.
    pub lowercase_names: bool,
    /// Load all records into memory when the table is opened.
    pub preload: bool,
    /// Return every field as its raw bytes, without decoding or memo lookups.
    pub raw: bool,
    /// Open tables whose memo file is missing; memo fields decode to NULL.
    pub ignore_missing_memo: bool,
    pub char_decode_errors: CharDecodeErrors,
    /// Per-tag decoders used instead of the built-in ones. A tag listed here
    /// is accepted even if no built-in decoder exists for it.
    pub decoders: HashMap<char, DecodeFn>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            ignore_case: true,
            lowercase_names: false,
            preload: false,
            raw: false,
            ignore_missing_memo: false,
            char_decode_errors: CharDecodeErrors::Strict,
            decoders: HashMap::new(),
        }
    }
}

impl TableOptions {
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_lowercase_names(mut self, lowercase_names: bool) -> Self {
        self.lowercase_names = lowercase_names;
        self
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_ignore_missing_memo(mut self, ignore_missing_memo: bool) -> Self {
        self.ignore_missing_memo = ignore_missing_memo;
        self
    }

    pub fn with_char_decode_errors(mut self, errors: CharDecodeErrors) -> Self {
        self.char_decode_errors = errors;
        self
    }

    pub fn with_decoder(mut self, tag: char, decode: DecodeFn) -> Self {
        self.decoders.insert(tag, decode);
        self
    }
}
