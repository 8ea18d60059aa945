//! # dbf-reader
//!
//! A reader for DBF table files (dBase III/IV, FoxBASE, FoxPro and Visual
//! FoxPro), including their `.fpt` / `.dbt` memo files.
//!
//! ```no_run
//! use dbf_reader::{DbfTable, TableOptions};
//!
//! let table = DbfTable::open_with("people.dbf", TableOptions::default().with_lowercase_names(true))?;
//! println!("{} ({} records)", table.name(), table.len()?);
//! for record in &table {
//!     let record = record?;
//!     println!("{:?}", record.get("name"));
//! }
//! # Ok::<(), dbf_reader::DbfError>(())
//! ```
pub mod dbf;

// Re-export the main types for convenience
pub use dbf::{
    DbfTable, RecordIterator, Records, RecordsView,
    format::fields::{DecodeFn, FieldDecoder},
    types::{
        codepages, versions,
        encoding::{CharDecodeErrors, TextEncoding},
        error::{DbfError, Result},
        models::{FieldDescriptor, Marker, Memo, MemoKind, TableHeader, Value},
        options::TableOptions,
        record::{MapFactory, PairsFactory, Record, RecordFactory},
    },
};
