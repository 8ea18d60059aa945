use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::format::header;
use super::iter::{Records, RecordsView, Scanner};
use super::types::encoding::TextEncoding;
use super::types::error::{DbfError, Result};
use super::types::models::{FieldDescriptor, Marker, TableHeader};
use super::types::options::TableOptions;
use super::types::record::{MapFactory, RecordFactory};
use super::types::versions;
use super::utils;

/// Records kept in memory by [`DbfTable::load`].
struct Loaded<R> {
    records: Vec<R>,
    deleted: Vec<R>,
}

/// A DBF table.
///
/// Opening a table reads the header and the schema only. Records are read
/// on demand, either streamed from the file on every traversal or, once
/// [`load`](Self::load)ed, replayed from memory.
///
/// `F` decides what a record looks like; the default produces an ordered
/// map from field name to [`Value`](crate::Value).
pub struct DbfTable<F: RecordFactory = MapFactory> {
    path: PathBuf,
    name: String,
    pub header: TableHeader,
    fields: Vec<FieldDescriptor>,
    encoding: TextEncoding,
    date: Option<NaiveDate>,
    memo_path: Option<PathBuf>,
    options: TableOptions,
    factory: F,
    loaded: Option<Loaded<F::Record>>,
}

impl DbfTable<MapFactory> {
    /// Opens a table with the default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, TableOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        Self::open_with_factory(path, options, MapFactory)
    }
}

impl<F: RecordFactory> DbfTable<F> {
    /// Opens a table, building records with `factory`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The table file does not exist (`NotFound`)
    /// - The schema has an unsupported type or a malformed `I` / `L` length
    /// - The encoding override is not a known label
    /// - Memo fields exist but no memo file does, unless
    ///   `ignore_missing_memo` is set
    /// - `preload` is set and a record fails to decode
    pub fn open_with_factory(
        path: impl AsRef<Path>,
        options: TableOptions,
        factory: F,
    ) -> Result<Self> {
        let requested = path.as_ref();
        let found = if options.ignore_case {
            utils::ifind(requested, None)
        } else {
            requested.is_file().then(|| requested.to_path_buf())
        };
        let path = found.ok_or_else(|| DbfError::NotFound(requested.to_path_buf()))?;
        info!("Opening DBF table: {}", path.display());

        let mut file = std::fs::File::open(&path)?;
        let parsed = header::parse(&mut file, &options)?;
        drop(file);

        let memo_path = find_memo(&path, &parsed.fields, options.ignore_missing_memo)?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let preload = options.preload;
        let mut table = Self {
            path,
            name,
            header: parsed.header,
            fields: parsed.fields,
            encoding: parsed.encoding,
            date: parsed.date,
            memo_path,
            options,
            factory,
            loaded: None,
        };

        if preload {
            table.load()?;
        }
        Ok(table)
    }

    /// Reads every active and deleted record into memory in one pass.
    ///
    /// Later traversals and counts are served from memory. Calling `load`
    /// on a loaded table reads the file again.
    pub fn load(&mut self) -> Result<()> {
        let loaded = self.read_all()?;
        debug!(
            "Loaded {} records ({} deleted)",
            loaded.records.len(),
            loaded.deleted.len()
        );
        self.loaded = Some(loaded);
        Ok(())
    }

    /// Drops the in-memory records; traversals stream from disk again.
    pub fn unload(&mut self) {
        self.loaded = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn read_all(&self) -> Result<Loaded<F::Record>> {
        let mut scanner = Scanner::open(self)?;
        let mut loaded = Loaded {
            records: Vec::new(),
            deleted: Vec::new(),
        };
        while let Some((marker, fields)) = scanner.next_row(None)? {
            let record = self.factory.build(fields);
            match marker {
                Marker::Active => loaded.records.push(record),
                Marker::Deleted => loaded.deleted.push(record),
            }
        }
        Ok(loaded)
    }

    pub(crate) fn loaded_records(&self, marker: Marker) -> Option<&[F::Record]> {
        self.loaded.as_ref().map(|loaded| match marker {
            Marker::Active => loaded.records.as_slice(),
            Marker::Deleted => loaded.deleted.as_slice(),
        })
    }

    /// The active records.
    pub fn records(&self) -> RecordsView<'_, F> {
        RecordsView::new(self, Marker::Active)
    }

    /// The records marked as deleted.
    pub fn deleted(&self) -> RecordsView<'_, F> {
        RecordsView::new(self, Marker::Deleted)
    }

    /// Iterates over the active records.
    pub fn iter(&self) -> Records<'_, F> {
        self.records().iter()
    }

    /// Iterates over the deleted records.
    pub fn iter_deleted(&self) -> Records<'_, F> {
        self.deleted().iter()
    }

    /// Number of active records. Counts on disk unless the table is loaded.
    pub fn len(&self) -> Result<usize> {
        self.records().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.records().is_empty()
    }

    /// Number of deleted records.
    pub fn deleted_len(&self) -> Result<usize> {
        self.deleted().len()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    pub fn version_name(&self) -> String {
        versions::version_name(self.header.version)
    }

    /// Date of last modification, if the header holds a valid one.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn memo_path(&self) -> Option<&Path> {
        self.memo_path.as_deref()
    }

    /// The file stem of the table, lower-cased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

/// Locates the memo file when the schema needs one.
fn find_memo(
    table: &Path,
    fields: &[FieldDescriptor],
    ignore_missing: bool,
) -> Result<Option<PathBuf>> {
    if !fields.iter().any(FieldDescriptor::is_memo) {
        return Ok(None);
    }

    match utils::find_memo_file(table) {
        Some(path) => {
            debug!("Memo file: {}", path.display());
            Ok(Some(path))
        }
        None if ignore_missing => {
            warn!(
                "No memo file for {}; memo fields will be NULL",
                table.display()
            );
            Ok(None)
        }
        None => Err(DbfError::MissingMemo(table.to_path_buf())),
    }
}

impl<'a, F: RecordFactory> IntoIterator for &'a DbfTable<F> {
    type Item = Result<F::Record>;
    type IntoIter = Records<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<F: RecordFactory> fmt::Display for DbfTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = if self.is_loaded() { "loaded" } else { "unloaded" };
        write!(f, "<{} DBF table {:?}>", state, self.path.display().to_string())
    }
}

impl<F: RecordFactory> fmt::Debug for DbfTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DbfTable")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("fields", &self.fields)
            .field("encoding", &self.encoding)
            .field("memo_path", &self.memo_path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
