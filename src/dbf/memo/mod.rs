//! Memo file backends.
//!
//! Memo fields store a block index; the payload lives in a companion file.
//! Three incompatible formats exist:
//!
//! - [`vfp`]: Visual FoxPro `.fpt`, block size in the file header, typed blocks
//! - [`dbase`]: dBase III `.dbt` (0x1A terminated) and dBase IV `.dbt`
//!   (length prefixed)
//!
//! [`NullMemo`] stands in when there is no memo file or raw mode is active.
//!
//! Every backend owns its file handle, which is closed when the backend is
//! dropped.

use std::path::Path;

use log::debug;

use crate::dbf::types::error::{DbfError, Result};
use crate::dbf::types::models::Memo;
use crate::dbf::types::versions::DBASE3_WITH_MEMO;

pub mod dbase;
pub mod vfp;

pub use dbase::{Dbase3MemoFile, Dbase4MemoFile};
pub use vfp::VfpMemoFile;

/// Block size of dBase III and IV memo files.
pub const DBASE_BLOCK_SIZE: u64 = 512;

/// Byte offset of block `index`; an offset past `u64::MAX` is a corrupt index.
pub(crate) fn block_offset(index: u64, block_size: u64) -> Result<u64> {
    index.checked_mul(block_size).ok_or_else(|| {
        DbfError::InvalidFormat(format!(
            "memo block {} of {} bytes is beyond any file",
            index, block_size
        ))
    })
}

/// Looks up memo payloads by block index.
pub trait MemoBackend {
    /// Returns the memo stored at `index`.
    ///
    /// Indexes of 0 or below never touch the file and yield `None`.
    fn fetch(&mut self, index: i64) -> Result<Option<Memo>>;
}

/// A backend that has no memos at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMemo;

impl MemoBackend for NullMemo {
    fn fetch(&mut self, _index: i64) -> Result<Option<Memo>> {
        Ok(None)
    }
}

/// Opens the memo file at `path` with the backend matching its format.
///
/// `.fpt` files are Visual FoxPro; `.dbt` files are dBase III for version
/// `0x83` and dBase IV otherwise.
pub fn open(path: &Path, version: u8) -> Result<Box<dyn MemoBackend>> {
    let is_fpt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fpt"));

    if is_fpt {
        debug!("Opening Visual FoxPro memo file {}", path.display());
        Ok(Box::new(VfpMemoFile::open(path)?))
    } else if version == DBASE3_WITH_MEMO {
        debug!("Opening dBase III memo file {}", path.display());
        Ok(Box::new(Dbase3MemoFile::open(path)?))
    } else {
        debug!("Opening dBase IV memo file {}", path.display());
        Ok(Box::new(Dbase4MemoFile::open(path)?))
    }
}
