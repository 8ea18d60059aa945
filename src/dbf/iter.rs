//! Record traversal.
//!
//! Records follow the header back to back, each `record_len` bytes long and
//! starting with a status byte:
//!
//! ```text
//! ' '   active record
//! '*'   deleted record
//! 0x1A  end of records (so is end of file)
//! ```
//!
//! Any other status byte is not a record and is skipped whole. Every traversal
//! opens its own handles on the table and the memo file; they are closed when
//! the traversal finishes or its iterator is dropped.
//!
//! # Example
//! ```no_run
//! # use dbf_reader::DbfTable;
//! let table = DbfTable::open("people.dbf").unwrap();
//! for record in table.iter() {
//!     let record = record.unwrap();
//!     println!("{:?}", record.get("NAME"));
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::slice;

use byteorder::ReadBytesExt;
use log::{debug, trace};

use super::format::fields::FieldDecoder;
use super::memo::{self, MemoBackend, NullMemo};
use super::reader::DbfTable;
use super::types::error::Result;
use super::types::models::{END_OF_RECORDS, FieldDescriptor, Marker, Value};
use super::types::record::RecordFactory;

fn marker_for(byte: u8) -> Option<Marker> {
    match byte {
        b' ' => Some(Marker::Active),
        b'*' => Some(Marker::Deleted),
        _ => None,
    }
}

/// Reads the status byte of the next record, `None` at the end of records.
fn read_status<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    match reader.read_u8() {
        Ok(END_OF_RECORDS) => Ok(None),
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn open_records<F: RecordFactory>(table: &DbfTable<F>) -> Result<BufReader<File>> {
    let mut reader = BufReader::new(File::open(table.path())?);
    reader.seek(SeekFrom::Start(table.header.header_len as u64))?;
    Ok(reader)
}

/// One pass over the record area with its own file handles.
pub(crate) struct Scanner<'a> {
    reader: BufReader<File>,
    decoder: FieldDecoder,
    fields: &'a [FieldDescriptor],
    record_len: u16,
    raw: bool,
}

impl<'a> Scanner<'a> {
    pub(crate) fn open<F: RecordFactory>(table: &'a DbfTable<F>) -> Result<Self> {
        let reader = open_records(table)?;
        let raw = table.options().raw;

        let memo: Box<dyn MemoBackend> = match table.memo_path() {
            Some(path) if !raw => memo::open(path, table.version())?,
            _ => Box::new(NullMemo),
        };
        let decoder = FieldDecoder::new(
            table.version(),
            table.encoding(),
            table.options().char_decode_errors,
            memo,
        )
        .with_overrides(table.options().decoders.clone());

        Ok(Self {
            reader,
            decoder,
            fields: table.fields(),
            record_len: table.header.record_len,
            raw,
        })
    }

    /// Decodes the next record whose marker is `wanted` (or any record when
    /// `wanted` is `None`), skipping the others.
    pub(crate) fn next_row(
        &mut self,
        wanted: Option<Marker>,
    ) -> Result<Option<(Marker, Vec<(String, Value)>)>> {
        while let Some(status) = read_status(&mut self.reader)? {
            match marker_for(status) {
                Some(marker) if wanted.is_none_or(|wanted| wanted == marker) => {
                    return Ok(Some((marker, self.read_fields()?)));
                }
                _ => {
                    trace!("Skipping record with status byte {:#04x}", status);
                    self.skip_record()?;
                }
            }
        }
        Ok(None)
    }

    fn read_fields(&mut self) -> Result<Vec<(String, Value)>> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let mut data = vec![0u8; field.length as usize];
            self.reader.read_exact(&mut data)?;
            let value = if self.raw {
                Value::Bytes(data)
            } else {
                self.decoder.decode(field, &data)?
            };
            values.push((field.name.clone(), value));
        }
        Ok(values)
    }

    fn skip_record(&mut self) -> Result<()> {
        let rest = self.record_len.saturating_sub(1);
        self.reader.seek_relative(rest as i64)?;
        Ok(())
    }
}

/// Counts the records carrying `marker` without decoding any field.
pub(crate) fn count<F: RecordFactory>(table: &DbfTable<F>, marker: Marker) -> Result<usize> {
    let mut reader = open_records(table)?;
    let rest = table.header.record_len.saturating_sub(1) as i64;
    let mut count = 0;

    while let Some(status) = read_status(&mut reader)? {
        if status == marker.byte() {
            count += 1;
        }
        reader.seek_relative(rest)?;
    }

    debug!("Counted {} {:?} records", count, marker);
    Ok(count)
}

/// Streams records with one marker straight from the file.
///
/// The file is opened on the first call to `next`. After an error the
/// iterator yields nothing more.
pub struct RecordIterator<'a, F: RecordFactory> {
    table: &'a DbfTable<F>,
    marker: Marker,
    scanner: Option<Scanner<'a>>,
    finished: bool,
}

impl<'a, F: RecordFactory> RecordIterator<'a, F> {
    pub(crate) fn new(table: &'a DbfTable<F>, marker: Marker) -> Self {
        Self {
            table,
            marker,
            scanner: None,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        // Releases the table and memo handles.
        self.scanner = None;
    }
}

impl<'a, F: RecordFactory> Iterator for RecordIterator<'a, F> {
    type Item = Result<F::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.scanner.is_none() {
            debug!("Starting {:?} record scan of {}", self.marker, self.table.path().display());
            match Scanner::open(self.table) {
                Ok(scanner) => self.scanner = Some(scanner),
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }

        let scanner = self.scanner.as_mut()?;
        match scanner.next_row(Some(self.marker)) {
            Ok(Some((_, fields))) => Some(Ok(self.table.factory().build(fields))),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<F: RecordFactory> FusedIterator for RecordIterator<'_, F> {}

/// Records of a table, streamed from disk or replayed from memory.
///
/// Created by [`DbfTable::iter`], [`DbfTable::iter_deleted`] and the
/// [`RecordsView`]s. Which strategy is used depends on whether the table is
/// loaded when the iterator is created.
pub enum Records<'a, F: RecordFactory> {
    Streaming(RecordIterator<'a, F>),
    Loaded(slice::Iter<'a, F::Record>),
}

impl<F: RecordFactory> Iterator for Records<'_, F> {
    type Item = Result<F::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Records::Streaming(iter) => iter.next(),
            Records::Loaded(iter) => iter.next().cloned().map(Ok),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Records::Streaming(iter) => iter.size_hint(),
            Records::Loaded(iter) => iter.size_hint(),
        }
    }
}

impl<F: RecordFactory> FusedIterator for Records<'_, F> {}

/// The active or the deleted records of a table.
///
/// A view can be iterated any number of times; each iteration is a fresh
/// traversal.
pub struct RecordsView<'a, F: RecordFactory> {
    table: &'a DbfTable<F>,
    marker: Marker,
}

impl<'a, F: RecordFactory> RecordsView<'a, F> {
    pub(crate) fn new(table: &'a DbfTable<F>, marker: Marker) -> Self {
        Self { table, marker }
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// Number of records in the view.
    ///
    /// Loaded tables answer from memory; otherwise the status bytes are
    /// counted on disk.
    pub fn len(&self) -> Result<usize> {
        match self.table.loaded_records(self.marker) {
            Some(records) => Ok(records.len()),
            None => count(self.table, self.marker),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn iter(&self) -> Records<'a, F> {
        match self.table.loaded_records(self.marker) {
            Some(records) => Records::Loaded(records.iter()),
            None => Records::Streaming(RecordIterator::new(self.table, self.marker)),
        }
    }
}

impl<'a, F: RecordFactory> IntoIterator for RecordsView<'a, F> {
    type Item = Result<F::Record>;
    type IntoIter = Records<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, F: RecordFactory> IntoIterator for &RecordsView<'a, F> {
    type Item = Result<F::Record>;
    type IntoIter = Records<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
