//! dBase III and dBase IV memo files (`.dbt`).
//!
//! Both use fixed 512-byte blocks addressed from the start of the file.
//!
//! - dBase III: the memo runs from `index * 512` up to the first 0x1A byte.
//! - dBase IV: each memo starts with an 8-byte header
//!   (`[4 bytes] 0xFF 0xFF 0x08 0x08`, `[4 bytes] length`, little-endian),
//!   and the text ends at the first 0x1F byte, if any.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::trace;

use super::{DBASE_BLOCK_SIZE, MemoBackend, block_offset};
use crate::dbf::format::layout::{Endian, FieldKind, Layout};
use crate::dbf::types::error::Result;
use crate::dbf::types::models::{Memo, MemoKind};

const DBASE3_TERMINATOR: u8 = 0x1A;
const DBASE4_TERMINATOR: u8 = 0x1F;

pub const DBASE4_BLOCK_HEADER: Layout = Layout::new(
    "dbt block header",
    Endian::Little,
    &[("reserved", FieldKind::U32), ("length", FieldKind::U32)],
);

#[derive(Debug)]
pub struct Dbase3MemoFile<R = File> {
    file: R,
}

impl Dbase3MemoFile<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> Dbase3MemoFile<R> {
    pub fn new(file: R) -> Self {
        Self { file }
    }
}

impl<R: Read + Seek> MemoBackend for Dbase3MemoFile<R> {
    fn fetch(&mut self, index: i64) -> Result<Option<Memo>> {
        if index <= 0 {
            return Ok(None);
        }

        let offset = block_offset(index as u64, DBASE_BLOCK_SIZE)?;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut data = Vec::new();
        loop {
            let before = data.len();
            self.file
                .by_ref()
                .take(DBASE_BLOCK_SIZE)
                .read_to_end(&mut data)?;
            if data.len() == before {
                // End of file without a terminator.
                break;
            }
            if let Some(end) = data.iter().position(|&b| b == DBASE3_TERMINATOR) {
                data.truncate(end);
                break;
            }
        }

        trace!("Memo {}: {} bytes", index, data.len());
        Ok(Some(Memo::new(MemoKind::Plain, data)))
    }
}

#[derive(Debug)]
pub struct Dbase4MemoFile<R = File> {
    file: R,
}

impl Dbase4MemoFile<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> Dbase4MemoFile<R> {
    pub fn new(file: R) -> Self {
        Self { file }
    }
}

impl<R: Read + Seek> MemoBackend for Dbase4MemoFile<R> {
    fn fetch(&mut self, index: i64) -> Result<Option<Memo>> {
        if index <= 0 {
            return Ok(None);
        }

        let offset = block_offset(index as u64, DBASE_BLOCK_SIZE)?;
        self.file.seek(SeekFrom::Start(offset))?;
        let header = DBASE4_BLOCK_HEADER.read(&mut self.file)?;
        let length = header.u32("length")? as u64;

        let mut data = Vec::new();
        self.file.by_ref().take(length).read_to_end(&mut data)?;
        if let Some(end) = data.iter().position(|&b| b == DBASE4_TERMINATOR) {
            data.truncate(end);
        }

        trace!("Memo {}: declared {} bytes, kept {}", index, length, data.len());
        Ok(Some(Memo::new(MemoKind::Plain, data)))
    }
}
