//! Core DBF reader module

pub mod format;
pub mod iter;
pub mod memo;
pub mod reader;
pub mod types;
pub mod utils;

pub use iter::{RecordIterator, Records, RecordsView};
pub use reader::DbfTable;
pub use types::{codepages, error, models, versions};
