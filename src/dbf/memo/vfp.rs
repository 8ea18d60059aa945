//! Visual FoxPro memo files (`.fpt`).
//!
//! # File Structure
//! ```text
//! [4 bytes]   Next free block (big-endian)
//! [2 bytes]   Reserved
//! [2 bytes]   Block size (big-endian)
//! [504 bytes] Reserved
//! ...
//! Block N at N * block size:
//!   [4 bytes] Type (0 picture, 1 text, 2 object; big-endian)
//!   [4 bytes] Payload length (big-endian)
//!   [length]  Payload
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::trace;

use super::{MemoBackend, block_offset};
use crate::dbf::format::layout::{Endian, FieldKind, Layout};
use crate::dbf::types::error::{DbfError, Result};
use crate::dbf::types::models::{Memo, MemoKind};

pub const FILE_HEADER: Layout = Layout::new(
    "fpt file header",
    Endian::Big,
    &[
        ("next_block", FieldKind::U32),
        ("reserved1", FieldKind::U16),
        ("block_size", FieldKind::U16),
        ("reserved2", FieldKind::Bytes(504)),
    ],
);

pub const BLOCK_HEADER: Layout = Layout::new(
    "fpt block header",
    Endian::Big,
    &[("type", FieldKind::U32), ("length", FieldKind::U32)],
);

#[derive(Debug)]
pub struct VfpMemoFile<R = File> {
    file: R,
    pub next_block: u32,
    pub block_size: u16,
}

impl VfpMemoFile<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> VfpMemoFile<R> {
    /// Reads the file header from the start of `file`.
    pub fn new(mut file: R) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let header = FILE_HEADER.read(&mut file)?;
        let next_block = header.u32("next_block")?;
        let block_size = header.u16("block_size")?;
        trace!("FPT header: next_block={}, block_size={}", next_block, block_size);
        Ok(Self {
            file,
            next_block,
            block_size,
        })
    }
}

impl<R: Read + Seek> MemoBackend for VfpMemoFile<R> {
    fn fetch(&mut self, index: i64) -> Result<Option<Memo>> {
        if index <= 0 {
            return Ok(None);
        }
        let index = index as u64;

        let offset = block_offset(index, self.block_size as u64)?;
        self.file.seek(SeekFrom::Start(offset))?;
        let block = BLOCK_HEADER.read(&mut self.file)?;
        let kind = MemoKind::from_vfp_type(block.u32("type")?);
        let length = block.u32("length")? as u64;

        let mut data = Vec::with_capacity(length as usize);
        self.file.by_ref().take(length).read_to_end(&mut data)?;
        if data.len() as u64 != length {
            return Err(DbfError::MemoRead {
                index,
                expected: length,
                found: data.len() as u64,
            });
        }

        trace!("Memo {}: {:?}, {} bytes", index, kind, length);
        Ok(Some(Memo::new(kind, data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fpt(block_size: u16, blocks: &[(u32, u32, &[u8])]) -> Vec<u8> {
        let mut data = vec![0u8; 512];
        data[6..8].copy_from_slice(&block_size.to_be_bytes());
        for (index, kind, payload) in blocks {
            let offset = *index as usize * block_size as usize;
            if data.len() < offset {
                data.resize(offset, 0);
            }
            data.truncate(offset);
            data.extend_from_slice(&kind.to_be_bytes());
            data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            data.extend_from_slice(payload);
        }
        data
    }

    #[test]
    fn typed_blocks() {
        let data = fpt(64, &[(8, 1, b"hello"), (9, 0, b"\x89PNG"), (10, 2, b"ole"), (11, 7, b"?")]);
        let mut memo = VfpMemoFile::new(Cursor::new(data)).unwrap();
        assert_eq!(memo.block_size, 64);

        let text = memo.fetch(8).unwrap().unwrap();
        assert_eq!(text, Memo::new(MemoKind::Text, b"hello".to_vec()));
        assert_eq!(memo.fetch(9).unwrap().unwrap().kind, MemoKind::Picture);
        assert_eq!(memo.fetch(10).unwrap().unwrap().kind, MemoKind::Object);
        assert_eq!(memo.fetch(11).unwrap().unwrap().kind, MemoKind::Binary);
    }

    #[test]
    fn non_positive_index_is_none() {
        let mut memo = VfpMemoFile::new(Cursor::new(fpt(64, &[]))).unwrap();
        assert_eq!(memo.fetch(0).unwrap(), None);
        assert_eq!(memo.fetch(-3).unwrap(), None);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut data = fpt(64, &[(8, 1, b"hello world")]);
        data.truncate(data.len() - 4);
        let mut memo = VfpMemoFile::new(Cursor::new(data)).unwrap();
        assert!(matches!(
            memo.fetch(8),
            Err(DbfError::MemoRead { index: 8, expected: 11, found: 7 })
        ));
    }

    #[test]
    fn huge_index_is_an_error() {
        let mut memo = VfpMemoFile::new(Cursor::new(fpt(64, &[(8, 1, b"hello")]))).unwrap();
        assert!(matches!(memo.fetch(i64::MAX), Err(DbfError::InvalidFormat(_))));
    }
}
