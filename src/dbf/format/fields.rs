//! Field value decoding.
//!
//! Each field type tag maps to one decoding function in a static table built
//! on first use. Two legacy tags alias existing decoders: `+` (autoincrement)
//! decodes like `I`, and `@` (timestamp) like `T`. New types are supported by
//! adding an entry to [`decoders`], or per table through
//! [`TableOptions::with_decoder`](crate::TableOptions::with_decoder).

use std::collections::HashMap;
use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{Duration, NaiveDate};

use crate::dbf::memo::MemoBackend;
use crate::dbf::types::encoding::{CharDecodeErrors, TextEncoding};
use crate::dbf::types::error::{DbfError, Result};
use crate::dbf::types::models::{FieldDescriptor, Value};
use crate::dbf::types::versions;

/// Offset between Julian day numbers and days counted from 0001-01-01
/// (which is day 1).
const JULIAN_DAY_OFFSET: i64 = 1_721_425;

/// Currency values carry four implied decimal places.
const CURRENCY_SCALE: i64 = 4;

/// Decodes the raw bytes of one field.
pub type DecodeFn = fn(&mut FieldDecoder, &FieldDescriptor, &[u8]) -> Result<Value>;

static DECODERS: OnceLock<HashMap<char, DecodeFn>> = OnceLock::new();

fn decoders() -> &'static HashMap<char, DecodeFn> {
    DECODERS.get_or_init(|| {
        let mut table: HashMap<char, DecodeFn> = HashMap::new();
        table.insert('0', decode_flags);
        table.insert('B', decode_binary);
        table.insert('C', decode_text);
        table.insert('D', decode_date);
        table.insert('F', decode_float);
        table.insert('G', decode_memo_payload);
        table.insert('I', decode_integer);
        table.insert('L', decode_logical);
        table.insert('M', decode_memo);
        table.insert('N', decode_numeric);
        table.insert('O', decode_double);
        table.insert('P', decode_memo_payload);
        table.insert('T', decode_timestamp);
        table.insert('V', decode_text);
        table.insert('Y', decode_currency);
        table.insert('+', decode_integer);
        table.insert('@', decode_timestamp);
        table
    })
}

/// Whether a decoder exists for the type tag.
pub fn is_supported(tag: char) -> bool {
    decoders().contains_key(&tag)
}

/// Decodes the raw bytes of fields for one table.
///
/// Holds the memo backend for the duration of a traversal; memo fields are
/// resolved as they are decoded.
pub struct FieldDecoder {
    version: u8,
    encoding: TextEncoding,
    errors: CharDecodeErrors,
    memo: Box<dyn MemoBackend>,
    overrides: HashMap<char, DecodeFn>,
}

impl FieldDecoder {
    pub fn new(
        version: u8,
        encoding: TextEncoding,
        errors: CharDecodeErrors,
        memo: Box<dyn MemoBackend>,
    ) -> Self {
        Self {
            version,
            encoding,
            errors,
            memo,
            overrides: HashMap::new(),
        }
    }

    /// Decoders that take precedence over the built-in ones for their tags.
    pub fn with_overrides(mut self, overrides: HashMap<char, DecodeFn>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn decode(&mut self, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
        let decode = self
            .overrides
            .get(&field.field_type)
            .or_else(|| decoders().get(&field.field_type))
            .copied()
            .ok_or_else(|| DbfError::UnsupportedFieldType {
                field: field.name.clone(),
                tag: field.field_type,
            })?;
        decode(self, field, data)
    }

    /// Decodes character data with the table's encoding and error policy.
    pub fn decode_text(&self, field: &FieldDescriptor, data: &[u8]) -> Result<String> {
        self.encoding.decode(data, self.errors).ok_or_else(|| {
            DbfError::decode(
                &field.name,
                format!("{:?} is not valid {}", String::from_utf8_lossy(data), self.encoding),
            )
        })
    }
}

/// Python-style `bytes.strip()` whitespace.
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

fn trim_bytes(data: &[u8], strip: impl Fn(u8) -> bool) -> &[u8] {
    let start = data.iter().position(|&b| !strip(b)).unwrap_or(data.len());
    let end = data.iter().rposition(|&b| !strip(b)).map_or(start, |i| i + 1);
    &data[start..end]
}

fn parse_int(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.trim().parse().ok()
}

fn parse_float(data: &[u8]) -> Option<f64> {
    std::str::from_utf8(data).ok()?.trim().parse().ok()
}

fn fixed<const N: usize>(field: &FieldDescriptor, data: &[u8]) -> Result<[u8; N]> {
    data.try_into().map_err(|_| {
        DbfError::decode(
            &field.name,
            format!("expected {} bytes for type {}, got {}", N, field.field_type, data.len()),
        )
    })
}

/// Flag fields (`0`) are returned as they are.
fn decode_flags(_: &mut FieldDecoder, _: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    Ok(Value::Bytes(data.to_vec()))
}

/// Character fields (`C`, and `V` varchar).
fn decode_text(decoder: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let end = data
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(0, |i| i + 1);
    decoder.decode_text(field, &data[..end]).map(Value::Text)
}

/// `YYYYMMDD`. Blank or zero-filled dates are NULL.
fn decode_date(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let parsed = (|| {
        let year = parse_int(data.get(0..4)?).filter(|&year| year >= 1)?;
        let month = parse_int(data.get(4..6)?)?;
        let day = parse_int(data.get(6..8)?)?;
        NaiveDate::from_ymd_opt(
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        )
    })();

    match parsed {
        Some(date) => Ok(Value::Date(date)),
        None if data.iter().all(|&b| matches!(b, b' ' | b'0' | 0)) => Ok(Value::Null),
        None => Err(DbfError::decode(
            &field.name,
            format!("invalid date {:?}", String::from_utf8_lossy(data)),
        )),
    }
}

/// Float fields. Some writers pad with `*`.
fn decode_float(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let data = trim_bytes(trim_bytes(data, is_space), |b| b == b'*');
    if data.is_empty() {
        return Ok(Value::Null);
    }
    parse_float(data).map(Value::Float).ok_or_else(|| {
        DbfError::decode(
            &field.name,
            format!("invalid float {:?}", String::from_utf8_lossy(data)),
        )
    })
}

/// Numeric fields: an integer when possible, a float otherwise.
fn decode_numeric(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let data = trim_bytes(trim_bytes(data, is_space), |b| b == b'*' || b == 0);

    if let Some(value) = parse_int(data) {
        return Ok(Value::Integer(value));
    }
    if trim_bytes(data, is_space).is_empty() {
        return Ok(Value::Null);
    }

    // Some writers use ',' as the decimal separator.
    let normalized: Vec<u8> = data
        .iter()
        .map(|&b| if b == b',' { b'.' } else { b })
        .collect();
    parse_float(&normalized).map(Value::Float).ok_or_else(|| {
        DbfError::decode(
            &field.name,
            format!("invalid number {:?}", String::from_utf8_lossy(data)),
        )
    })
}

/// `I` and `+`: 32-bit little-endian signed integer.
fn decode_integer(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let bytes = fixed::<4>(field, data)?;
    Ok(Value::Integer(LittleEndian::read_i32(&bytes) as i64))
}

fn decode_logical(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    match data {
        [b'T' | b't' | b'Y' | b'y'] => Ok(Value::Bool(true)),
        [b'F' | b'f' | b'N' | b'n'] => Ok(Value::Bool(false)),
        [b'?' | b' ' | 0] => Ok(Value::Null),
        _ => Err(DbfError::decode(
            &field.name,
            format!("Illegal value for logical field: {:?}", String::from_utf8_lossy(data)),
        )),
    }
}

/// Reads the memo block index stored in a field.
///
/// Four-byte fields hold a little-endian integer (Visual FoxPro); wider ones
/// hold ASCII digits (dBase), where a blank field means "no memo".
fn memo_index(field: &FieldDescriptor, data: &[u8]) -> Result<i64> {
    if data.len() == 4 {
        return Ok(LittleEndian::read_u32(data) as i64);
    }
    if let Some(index) = parse_int(data) {
        return Ok(index);
    }
    if data.iter().all(|&b| b == b' ' || b == 0) {
        return Ok(0);
    }
    Err(DbfError::decode(
        &field.name,
        format!("Memo index is not an integer: {:?}", String::from_utf8_lossy(data)),
    ))
}

/// `M`: text memos are decoded, binary ones are returned as they are.
fn decode_memo(decoder: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let index = memo_index(field, data)?;
    match decoder.memo.fetch(index)? {
        None => Ok(Value::Null),
        Some(memo) if memo.kind.is_binary() => Ok(Value::Memo(memo)),
        Some(memo) => decoder.decode_text(field, &memo.data).map(Value::Text),
    }
}

/// `G` (OLE object) and `P` (picture): the payload is never decoded.
fn decode_memo_payload(
    decoder: &mut FieldDecoder,
    field: &FieldDescriptor,
    data: &[u8],
) -> Result<Value> {
    let index = memo_index(field, data)?;
    Ok(decoder.memo.fetch(index)?.map_or(Value::Null, Value::Memo))
}

/// `B` is a double in Visual FoxPro and a binary memo elsewhere.
fn decode_binary(decoder: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    if versions::is_visual_foxpro(decoder.version) {
        decode_double(decoder, field, data)
    } else {
        decode_memo_payload(decoder, field, data)
    }
}

/// `O`: 8-byte IEEE double.
fn decode_double(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let bytes = fixed::<8>(field, data)?;
    Ok(Value::Float(LittleEndian::read_f64(&bytes)))
}

/// `T` and `@`: Julian day number and milliseconds since midnight.
///
/// A day number of 0 is NULL. Files exist where day 0 comes with a small
/// non-zero time; those are NULL too. This follows observed files rather
/// than any documented rule.
fn decode_timestamp(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    if trim_bytes(data, is_space).is_empty() {
        return Ok(Value::Null);
    }

    let bytes = fixed::<8>(field, data)?;
    let day = LittleEndian::read_u32(&bytes[0..4]) as i64;
    let msec = LittleEndian::read_u32(&bytes[4..8]) as i64;
    if day == 0 {
        return Ok(Value::Null);
    }

    let datetime = i32::try_from(day - JULIAN_DAY_OFFSET)
        .ok()
        .filter(|&days| days >= 1)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.checked_add_signed(Duration::milliseconds(msec)))
        .ok_or_else(|| {
            DbfError::decode(
                &field.name,
                format!("timestamp out of range (day {}, msec {})", day, msec),
            )
        })?;
    Ok(Value::DateTime(datetime))
}

/// `Y`: 64-bit little-endian integer with four implied decimals.
fn decode_currency(_: &mut FieldDecoder, field: &FieldDescriptor, data: &[u8]) -> Result<Value> {
    let bytes = fixed::<8>(field, data)?;
    let value = LittleEndian::read_i64(&bytes);
    Ok(Value::Currency(BigDecimal::new(BigInt::from(value), CURRENCY_SCALE)))
}
