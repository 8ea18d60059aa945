//! Table header and field descriptor parsing.
//!
//! # File Structure
//! ```text
//! [32 bytes]      Table header (little-endian)
//! [32 bytes] * N  Field descriptors, terminated by 0x0D (or 0x0A / EOF)
//! [...]           Padding up to `header_len`
//! [record_len] *  Records, each starting with a marker byte
//! ```

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use log::{debug, info, trace, warn};

use super::fields::{self, DecodeFn};
use super::layout::{Endian, FieldKind, Layout};
use crate::dbf::types::{
    codepages,
    encoding::{CharDecodeErrors, TextEncoding},
    error::{DbfError, Result},
    models::{FieldDescriptor, TableHeader},
    options::TableOptions,
};

pub const TABLE_HEADER: Layout = Layout::new(
    "table header",
    Endian::Little,
    &[
        ("version", FieldKind::U8),
        ("year", FieldKind::U8),
        ("month", FieldKind::U8),
        ("day", FieldKind::U8),
        ("num_records", FieldKind::U32),
        ("header_len", FieldKind::U16),
        ("record_len", FieldKind::U16),
        ("reserved1", FieldKind::U16),
        ("incomplete_transaction", FieldKind::U8),
        ("encryption_flag", FieldKind::U8),
        ("free_record_thread", FieldKind::U32),
        ("reserved2", FieldKind::U32),
        ("reserved3", FieldKind::U32),
        ("mdx_flag", FieldKind::U8),
        ("language_driver", FieldKind::U8),
        ("reserved4", FieldKind::U16),
    ],
);

pub const FIELD_DESCRIPTOR: Layout = Layout::new(
    "field descriptor",
    Endian::Little,
    &[
        ("name", FieldKind::Bytes(11)),
        ("type", FieldKind::Bytes(1)),
        ("address", FieldKind::U32),
        ("length", FieldKind::U8),
        ("decimal_count", FieldKind::U8),
        ("reserved1", FieldKind::U16),
        ("workarea_id", FieldKind::U8),
        ("reserved2", FieldKind::U8),
        ("reserved3", FieldKind::U8),
        ("set_fields_flag", FieldKind::U8),
        ("reserved4", FieldKind::Bytes(7)),
        ("index_field_flag", FieldKind::U8),
    ],
);

/// Everything read from the start of a table file.
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub header: TableHeader,
    pub fields: Vec<FieldDescriptor>,
    pub encoding: TextEncoding,
    /// Date of last modification, `None` when the stored date is invalid.
    pub date: Option<NaiveDate>,
}

/// Parses the table header and the field descriptor array.
///
/// The reader must be positioned at the start of the file. Descriptor
/// invariants are validated here so a bad schema fails at open time.
pub fn parse<R: Read>(file: &mut R, options: &TableOptions) -> Result<ParsedHeader> {
    let header = read_table_header(file)?;
    trace!("{:?}", header);

    let encoding = resolve_encoding(options.encoding.as_deref(), header.language_driver)?;
    debug!("Text encoding: {}", encoding);

    let fields = read_field_descriptors(
        file,
        encoding,
        options.char_decode_errors,
        options.lowercase_names,
    )?;
    check_fields(&fields, &options.decoders)?;

    let date = modification_date(header.year, header.month, header.day);

    info!(
        "Header parsed: version={:#04x}, records={}, fields={}, encoding={}",
        header.version,
        header.num_records,
        fields.len(),
        encoding
    );

    Ok(ParsedHeader {
        header,
        fields,
        encoding,
        date,
    })
}

pub fn read_table_header<R: Read>(file: &mut R) -> Result<TableHeader> {
    let raw = TABLE_HEADER.read(file)?;
    Ok(TableHeader {
        version: raw.u8("version")?,
        year: raw.u8("year")?,
        month: raw.u8("month")?,
        day: raw.u8("day")?,
        num_records: raw.u32("num_records")?,
        header_len: raw.u16("header_len")?,
        record_len: raw.u16("record_len")?,
        reserved1: raw.u16("reserved1")?,
        incomplete_transaction: raw.u8("incomplete_transaction")?,
        encryption_flag: raw.u8("encryption_flag")?,
        free_record_thread: raw.u32("free_record_thread")?,
        reserved2: raw.u32("reserved2")?,
        reserved3: raw.u32("reserved3")?,
        mdx_flag: raw.u8("mdx_flag")?,
        language_driver: raw.u8("language_driver")?,
        reserved4: raw.u16("reserved4")?,
    })
}

/// Picks the text encoding: an explicit label wins, then the language driver,
/// then plain ASCII.
pub fn resolve_encoding(label: Option<&str>, language_driver: u8) -> Result<TextEncoding> {
    if let Some(label) = label {
        return TextEncoding::for_label(label)
            .ok_or_else(|| DbfError::UnknownEncoding(label.to_string()));
    }

    match codepages::guess_encoding(language_driver) {
        Some(encoding) => Ok(encoding),
        None => {
            warn!(
                "No decoder for language driver {:#04x} ({}), falling back to ascii",
                language_driver,
                codepages::codepage_name(language_driver).unwrap_or("unknown")
            );
            Ok(TextEncoding::Ascii)
        }
    }
}

/// Reads descriptors until a 0x0D / 0x0A terminator or end of stream.
pub fn read_field_descriptors<R: Read>(
    file: &mut R,
    encoding: TextEncoding,
    errors: CharDecodeErrors,
    lowercase_names: bool,
) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();

    loop {
        let mut marker = [0u8; 1];
        if file.read(&mut marker)? == 0 || matches!(marker[0], b'\r' | b'\n') {
            break;
        }

        // The marker is the first byte of the descriptor's name.
        let mut buf = marker.to_vec();
        file.by_ref()
            .take(FIELD_DESCRIPTOR.size() as u64 - 1)
            .read_to_end(&mut buf)?;
        let raw = FIELD_DESCRIPTOR.unpack(&buf)?;

        let field_type = raw.bytes("type")?[0] as char;
        let mut length = raw.u8("length")? as u16;
        let mut decimal_count = raw.u8("decimal_count")?;

        // Character fields longer than 255 bytes keep the high byte of
        // their length in the decimal count.
        if field_type == 'C' {
            length |= (decimal_count as u16) << 8;
            decimal_count = 0;
        }

        let name_bytes = raw.bytes("name")?;
        let name_bytes = name_bytes
            .split(|&b| b == 0)
            .next()
            .unwrap_or_default();
        let mut name = encoding.decode(name_bytes, errors).ok_or_else(|| {
            DbfError::InvalidFormat(format!(
                "field name {:?} is not valid {}",
                String::from_utf8_lossy(name_bytes),
                encoding
            ))
        })?;
        if lowercase_names {
            name = name.to_lowercase();
        }

        let mut reserved4 = [0u8; 7];
        reserved4.copy_from_slice(raw.bytes("reserved4")?);

        let field = FieldDescriptor {
            name,
            field_type,
            address: raw.u32("address")?,
            length,
            decimal_count,
            reserved1: raw.u16("reserved1")?,
            workarea_id: raw.u8("workarea_id")?,
            reserved2: raw.u8("reserved2")?,
            reserved3: raw.u8("reserved3")?,
            set_fields_flag: raw.u8("set_fields_flag")?,
            reserved4,
            index_field_flag: raw.u8("index_field_flag")?,
        };
        trace!(
            "Field {}: type={} length={} decimals={}",
            field.name, field.field_type, field.length, field.decimal_count
        );
        fields.push(field);
    }

    Ok(fields)
}

/// Validates the schema against the decoders. Tags with an override skip the
/// built-in length checks.
pub fn check_fields(fields: &[FieldDescriptor], overrides: &HashMap<char, DecodeFn>) -> Result<()> {
    for field in fields {
        if overrides.contains_key(&field.field_type) {
            continue;
        }
        let expected = match field.field_type {
            'I' => Some(4),
            'L' => Some(1),
            _ => None,
        };
        if let Some(expected) = expected
            && field.length != expected
        {
            return Err(DbfError::MalformedFieldLength {
                field: field.name.clone(),
                tag: field.field_type,
                expected,
                found: field.length,
            });
        }

        if !fields::is_supported(field.field_type) {
            return Err(DbfError::UnsupportedFieldType {
                field: field.name.clone(),
                tag: field.field_type,
            });
        }
    }
    Ok(())
}

/// Converts a two-digit year: below 80 is 20xx, otherwise 19xx.
pub fn expand_year(year: u8) -> i32 {
    if year < 80 {
        2000 + year as i32
    } else {
        1900 + year as i32
    }
}

/// Builds the modification date, or `None` for invalid dates such as the
/// common all-zero header.
pub fn modification_date(year: u8, month: u8, day: u8) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(expand_year(year), month as u32, day as u32)
}
