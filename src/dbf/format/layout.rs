//! Generic decoder for fixed-layout binary structures.
//!
//! Every on-disk structure in a DBF table or memo file is a flat sequence of
//! integers and byte blocks. A [`Layout`] describes one such structure (its
//! byte order and named fields) and turns a buffer of exactly the right size
//! into a [`Decoded`] set of named values.
//!
//! No reinterpretation happens here: callers apply format quirks such as the
//! high-byte length extension themselves.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::dbf::types::error::{DbfError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// The type of one field within a [`Layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I32,
    U64,
    I64,
    /// A fixed-length block of bytes (also used for fixed-length strings).
    Bytes(usize),
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
            FieldKind::U64 | FieldKind::I64 => 8,
            FieldKind::Bytes(len) => len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutValue {
    Unsigned(u64),
    Signed(i64),
    Bytes(Vec<u8>),
}

/// A fixed binary structure: a name for error messages, a byte order and
/// an ordered list of named fields.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub name: &'static str,
    pub endian: Endian,
    pub fields: &'static [(&'static str, FieldKind)],
}

impl Layout {
    pub const fn new(
        name: &'static str,
        endian: Endian,
        fields: &'static [(&'static str, FieldKind)],
    ) -> Self {
        Self { name, endian, fields }
    }

    /// Total size of the structure in bytes.
    pub fn size(&self) -> usize {
        self.fields.iter().map(|(_, kind)| kind.width()).sum()
    }

    /// Decodes a buffer that must be exactly [`size`](Self::size) bytes long.
    pub fn unpack(&self, data: &[u8]) -> Result<Decoded> {
        let expected = self.size();
        if data.len() != expected {
            return Err(DbfError::SizeMismatch {
                context: self.name,
                expected: expected as u64,
                found: data.len() as u64,
            });
        }

        let values = match self.endian {
            Endian::Little => unpack_with::<LittleEndian>(self.fields, data),
            Endian::Big => unpack_with::<BigEndian>(self.fields, data),
        };

        Ok(Decoded {
            layout: self.name,
            values,
        })
    }

    /// Reads exactly [`size`](Self::size) bytes from `reader` and decodes them.
    ///
    /// A stream that ends early produces a size mismatch, not an I/O error.
    pub fn read<R: Read>(&self, reader: &mut R) -> Result<Decoded> {
        let mut buf = Vec::with_capacity(self.size());
        reader.by_ref().take(self.size() as u64).read_to_end(&mut buf)?;
        self.unpack(&buf)
    }
}

fn unpack_with<B: ByteOrder>(
    fields: &'static [(&'static str, FieldKind)],
    data: &[u8],
) -> Vec<(&'static str, LayoutValue)> {
    let mut offset = 0;
    fields
        .iter()
        .map(|&(name, kind)| {
            let chunk = &data[offset..offset + kind.width()];
            offset += kind.width();
            let value = match kind {
                FieldKind::U8 => LayoutValue::Unsigned(chunk[0] as u64),
                FieldKind::U16 => LayoutValue::Unsigned(B::read_u16(chunk) as u64),
                FieldKind::U32 => LayoutValue::Unsigned(B::read_u32(chunk) as u64),
                FieldKind::I32 => LayoutValue::Signed(B::read_i32(chunk) as i64),
                FieldKind::U64 => LayoutValue::Unsigned(B::read_u64(chunk)),
                FieldKind::I64 => LayoutValue::Signed(B::read_i64(chunk)),
                FieldKind::Bytes(_) => LayoutValue::Bytes(chunk.to_vec()),
            };
            (name, value)
        })
        .collect()
}

/// The named values of one decoded structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    layout: &'static str,
    values: Vec<(&'static str, LayoutValue)>,
}

impl Decoded {
    pub fn get(&self, name: &str) -> Option<&LayoutValue> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    fn missing(&self, name: &str, wanted: &str) -> DbfError {
        DbfError::InvalidFormat(format!(
            "{} has no {} field named '{}'",
            self.layout, wanted, name
        ))
    }

    pub fn unsigned(&self, name: &str) -> Result<u64> {
        match self.get(name) {
            Some(LayoutValue::Unsigned(value)) => Ok(*value),
            _ => Err(self.missing(name, "unsigned")),
        }
    }

    pub fn signed(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(LayoutValue::Signed(value)) => Ok(*value),
            _ => Err(self.missing(name, "signed")),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        match self.get(name) {
            Some(LayoutValue::Bytes(value)) => Ok(value),
            _ => Err(self.missing(name, "byte block")),
        }
    }

    pub fn u8(&self, name: &str) -> Result<u8> {
        self.narrow(name)
    }

    pub fn u16(&self, name: &str) -> Result<u16> {
        self.narrow(name)
    }

    pub fn u32(&self, name: &str) -> Result<u32> {
        self.narrow(name)
    }

    fn narrow<T: TryFrom<u64>>(&self, name: &str) -> Result<T> {
        let value = self.unsigned(name)?;
        T::try_from(value).map_err(|_| {
            DbfError::InvalidFormat(format!(
                "{}.{} value {} does not fit the requested width",
                self.layout, name, value
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR_LE: Layout = Layout::new(
        "pair",
        Endian::Little,
        &[("kind", FieldKind::U32), ("length", FieldKind::U32)],
    );
    const PAIR_BE: Layout = Layout::new(
        "pair",
        Endian::Big,
        &[("kind", FieldKind::U32), ("length", FieldKind::U32)],
    );

    #[test]
    fn byte_order_is_a_layout_property() {
        let data = [0, 0, 0, 1, 0x10, 0, 0, 0];
        let le = PAIR_LE.unpack(&data).unwrap();
        let be = PAIR_BE.unpack(&data).unwrap();
        assert_eq!(le.u32("kind").unwrap(), 0x0100_0000);
        assert_eq!(le.u32("length").unwrap(), 0x10);
        assert_eq!(be.u32("kind").unwrap(), 1);
        assert_eq!(be.u32("length").unwrap(), 0x1000_0000);
    }

    #[test]
    fn mixed_fields() {
        const MIXED: Layout = Layout::new(
            "mixed",
            Endian::Little,
            &[
                ("name", FieldKind::Bytes(3)),
                ("flag", FieldKind::U8),
                ("delta", FieldKind::I32),
                ("count", FieldKind::U16),
            ],
        );
        assert_eq!(MIXED.size(), 10);
        let mut data = b"abc\x07".to_vec();
        data.extend_from_slice(&(-5i32).to_le_bytes());
        data.extend_from_slice(&513u16.to_le_bytes());
        let decoded = MIXED.unpack(&data).unwrap();
        assert_eq!(decoded.bytes("name").unwrap(), b"abc");
        assert_eq!(decoded.u8("flag").unwrap(), 7);
        assert_eq!(decoded.signed("delta").unwrap(), -5);
        assert_eq!(decoded.u16("count").unwrap(), 513);
        assert!(decoded.u8("count").is_err());
        assert!(decoded.unsigned("missing").is_err());
    }

    #[test]
    fn short_buffer_is_a_size_mismatch() {
        match PAIR_LE.unpack(&[1, 2, 3]) {
            Err(DbfError::SizeMismatch { expected: 8, found: 3, .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        let mut short: &[u8] = &[1, 2, 3, 4, 5];
        assert!(matches!(
            PAIR_LE.read(&mut short),
            Err(DbfError::SizeMismatch { expected: 8, found: 5, .. })
        ));
    }

    #[test]
    fn read_consumes_exactly_the_layout() {
        let mut stream: &[u8] = &[1, 0, 0, 0, 2, 0, 0, 0, 9];
        let decoded = PAIR_LE.read(&mut stream).unwrap();
        assert_eq!(decoded.u32("length").unwrap(), 2);
        assert_eq!(stream, &[9]);
    }
}
