use chrono::NaiveDate;
use dbf_reader::{
    CharDecodeErrors, DbfError, DbfTable, FieldDecoder, FieldDescriptor, Memo, MemoKind,
    PairsFactory, TableOptions, Value,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes DBF files field by field, the way the format lays them out.
struct TableBuilder {
    version: u8,
    language_driver: u8,
    fields: Vec<(String, u8, u8, u8)>,
    records: Vec<Vec<u8>>,
    end_marker: bool,
}

impl TableBuilder {
    fn new(version: u8) -> Self {
        Self {
            version,
            language_driver: 0x00,
            fields: Vec::new(),
            records: Vec::new(),
            end_marker: true,
        }
    }

    fn language_driver(mut self, language_driver: u8) -> Self {
        self.language_driver = language_driver;
        self
    }

    fn field(mut self, name: &str, tag: u8, length: u8, decimals: u8) -> Self {
        self.fields.push((name.to_string(), tag, length, decimals));
        self
    }

    fn record(mut self, marker: u8, values: &[&[u8]]) -> Self {
        let mut record = vec![marker];
        for value in values {
            record.extend_from_slice(value);
        }
        assert_eq!(record.len(), self.record_len(), "fixture record length");
        self.records.push(record);
        self
    }

    fn without_end_marker(mut self) -> Self {
        self.end_marker = false;
        self
    }

    fn field_len(&(_, tag, length, decimals): &(String, u8, u8, u8)) -> usize {
        if tag == b'C' {
            length as usize | (decimals as usize) << 8
        } else {
            length as usize
        }
    }

    fn record_len(&self) -> usize {
        1 + self.fields.iter().map(Self::field_len).sum::<usize>()
    }

    fn build(&self) -> Vec<u8> {
        let header_len = 32 + 32 * self.fields.len() + 1;
        let mut data = vec![0u8; 32];
        data[0] = self.version;
        data[1..4].copy_from_slice(&[24, 3, 15]);
        data[4..8].copy_from_slice(&(self.records.len() as u32).to_le_bytes());
        data[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
        data[10..12].copy_from_slice(&(self.record_len() as u16).to_le_bytes());
        data[29] = self.language_driver;

        let mut address = 1u32;
        for field in &self.fields {
            let (name, tag, length, decimals) = field;
            let mut descriptor = vec![0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *tag;
            descriptor[12..16].copy_from_slice(&address.to_le_bytes());
            descriptor[16] = *length;
            descriptor[17] = *decimals;
            data.extend_from_slice(&descriptor);
            address += Self::field_len(field) as u32;
        }
        data.push(0x0D);
        assert_eq!(data.len(), header_len);

        for record in &self.records {
            data.extend_from_slice(record);
        }
        if self.end_marker {
            data.push(0x1A);
        }
        data
    }

    fn write(&self, path: &Path) {
        fs::write(path, self.build()).unwrap();
    }
}

fn text(value: &str, length: usize) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(length, b' ');
    bytes
}

/// A Visual FoxPro memo file with 64-byte blocks; memo `n` lives in block `8 + n`.
fn fpt(memos: &[(u32, &[u8])]) -> (Vec<u8>, Vec<u32>) {
    const BLOCK_SIZE: usize = 64;
    let mut data = vec![0u8; 512];
    data[6..8].copy_from_slice(&(BLOCK_SIZE as u16).to_be_bytes());
    let mut indexes = Vec::new();
    for (kind, payload) in memos {
        let index = data.len().div_ceil(BLOCK_SIZE);
        data.resize(index * BLOCK_SIZE, 0);
        data.extend_from_slice(&kind.to_be_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        data.extend_from_slice(payload);
        indexes.push(index as u32);
    }
    let next_free = data.len().div_ceil(BLOCK_SIZE) as u32;
    data[0..4].copy_from_slice(&next_free.to_be_bytes());
    (data, indexes)
}

/// A dBase III memo file; memo `n` starts at block `n + 1`.
fn dbt3(memos: &[&[u8]]) -> Vec<u8> {
    let mut data = vec![0u8; 512];
    for memo in memos {
        let mut block = memo.to_vec();
        block.extend_from_slice(&[0x1A, 0x1A]);
        block.resize(block.len().div_ceil(512) * 512, 0);
        data.extend_from_slice(&block);
    }
    data
}

/// A dBase IV memo file; memo `n` starts at block `n + 1`.
fn dbt4(memos: &[&[u8]]) -> Vec<u8> {
    let mut data = vec![0u8; 512];
    for memo in memos {
        let mut block = vec![0xFF, 0xFF, 0x08, 0x08];
        block.extend_from_slice(&(memo.len() as u32 + 8).to_le_bytes());
        block.extend_from_slice(memo);
        block.extend_from_slice(&[0x1F, 0x1F]);
        block.resize(block.len().div_ceil(512) * 512, 0);
        data.extend_from_slice(&block);
    }
    data
}

fn people(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("people.dbf");
    TableBuilder::new(0x03)
        .field("NAME", b'C', 16, 0)
        .field("BIRTHDATE", b'D', 8, 0)
        .record(b' ', &[&text("Alice", 16), b"19870301"])
        .record(b'*', &[&text("Deleted Guy", 16), b"19790323"])
        .write(&path);
    path
}

#[test]
fn reads_active_and_deleted_records() {
    let dir = tempfile::tempdir().unwrap();
    let table = DbfTable::open(people(&dir)).unwrap();

    assert_eq!(table.field_names(), ["NAME", "BIRTHDATE"]);
    assert_eq!(table.header.num_records, 2);
    assert_eq!(table.len().unwrap(), 1);
    assert_eq!(table.deleted_len().unwrap(), 1);

    let records: Vec<_> = table.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["NAME"], Value::Text("Alice".into()));
    assert_eq!(
        records[0]["BIRTHDATE"],
        Value::Date(NaiveDate::from_ymd_opt(1987, 3, 1).unwrap())
    );

    let deleted: Vec<_> = table.iter_deleted().collect::<Result<_, _>>().unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["NAME"], Value::Text("Deleted Guy".into()));
    assert_eq!(
        deleted[0]["BIRTHDATE"],
        Value::Date(NaiveDate::from_ymd_opt(1979, 3, 23).unwrap())
    );
}

#[test]
fn table_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = people(&dir);
    let table = DbfTable::open(&path).unwrap();

    assert_eq!(table.name(), "people");
    assert_eq!(table.path(), path);
    assert_eq!(table.version(), 0x03);
    assert_eq!(table.version_name(), "FoxBASE+/Dbase III plus, no memory");
    assert_eq!(table.date(), NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(table.encoding().name(), "ascii");
    assert_eq!(table.memo_path(), None);
    assert_eq!(table.fields()[0].field_type, 'C');
    assert_eq!(table.fields()[0].length, 16);
    assert_eq!(table.fields()[1].address, 17);
    assert!(!table.is_loaded());
    assert_eq!(
        table.to_string(),
        format!("<unloaded DBF table {:?}>", path.display().to_string())
    );
}

#[test]
fn counts_add_up_to_header_record_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.dbf");
    let mut builder = TableBuilder::new(0x03).field("N", b'N', 3, 0);
    for i in 0..7 {
        let marker = if i % 3 == 0 { b'*' } else { b' ' };
        builder = builder.record(marker, &[format!("{:>3}", i).as_bytes()]);
    }
    builder.write(&path);

    let table = DbfTable::open(&path).unwrap();
    let active = table.len().unwrap();
    let deleted = table.deleted_len().unwrap();
    assert_eq!((active, deleted), (4, 3));
    assert_eq!(active + deleted, table.header.num_records as usize);
    assert_eq!(table.records().len().unwrap(), active);
    assert!(!table.deleted().is_empty().unwrap());
}

#[test]
fn unknown_markers_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.dbf");
    TableBuilder::new(0x03)
        .field("ID", b'N', 2, 0)
        .record(b' ', &[b" 1"])
        .record(b'?', &[b" 2"])
        .record(b' ', &[b" 3"])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let ids: Vec<_> = table
        .iter()
        .map(|record| record.unwrap()["ID"].clone())
        .collect();
    assert_eq!(ids, [Value::Integer(1), Value::Integer(3)]);
    assert_eq!(table.len().unwrap(), 2);
    assert_eq!(table.deleted_len().unwrap(), 0);
}

#[test]
fn end_of_file_ends_the_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noeof.dbf");
    TableBuilder::new(0x03)
        .field("ID", b'N', 2, 0)
        .record(b' ', &[b" 1"])
        .record(b' ', &[b" 2"])
        .without_end_marker()
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    assert_eq!(table.iter().count(), 2);
    assert_eq!(table.len().unwrap(), 2);
}

#[test]
fn preloaded_tables_match_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let path = people(&dir);

    let streamed = DbfTable::open(&path).unwrap();
    let preloaded =
        DbfTable::open_with(&path, TableOptions::default().with_preload(true)).unwrap();
    assert!(preloaded.is_loaded());
    assert!(preloaded.to_string().starts_with("<loaded DBF table"));

    let collect = |table: &DbfTable| {
        (
            table.iter().collect::<Result<Vec<_>, _>>().unwrap(),
            table.iter_deleted().collect::<Result<Vec<_>, _>>().unwrap(),
        )
    };
    assert_eq!(collect(&streamed), collect(&preloaded));
    assert_eq!(preloaded.len().unwrap(), 1);
    assert_eq!(preloaded.deleted_len().unwrap(), 1);

    // Loaded records survive the file going away, and unloading brings
    // back streaming.
    let mut preloaded = preloaded;
    fs::remove_file(&path).unwrap();
    assert_eq!(preloaded.iter().count(), 1);
    preloaded.unload();
    assert!(!preloaded.is_loaded());
    assert!(matches!(preloaded.iter().next(), Some(Err(DbfError::Io(_)))));
}

#[test]
fn views_can_be_iterated_repeatedly() {
    let dir = tempfile::tempdir().unwrap();
    let table = DbfTable::open(people(&dir)).unwrap();

    let records = table.records();
    assert_eq!(records.iter().count(), 1);
    assert_eq!((&records).into_iter().count(), 1);
    assert_eq!((&table).into_iter().count(), 1);
    assert_eq!(table.deleted().into_iter().count(), 1);
}

#[test]
fn visual_foxpro_memos() {
    let dir = tempfile::tempdir().unwrap();
    let (memo, indexes) = fpt(&[
        (1, &b"A long story"[..]),
        (0, &b"\x89PNG\r\n"[..]),
        (2, &b"OLE"[..]),
    ]);
    fs::write(dir.path().join("notes.fpt"), memo).unwrap();

    let path = dir.path().join("notes.dbf");
    let index = |i: usize| indexes[i].to_le_bytes();
    TableBuilder::new(0x30)
        .language_driver(0x03)
        .field("NOTE", b'M', 4, 0)
        .field("PIC", b'P', 4, 0)
        .field("OBJ", b'G', 4, 0)
        .field("SCORE", b'B', 8, 0)
        .record(b' ', &[&index(0), &index(1), &index(2), &2.5f64.to_le_bytes()])
        .record(b' ', &[&index(1), &[0u8; 4], &[0u8; 4], &0f64.to_le_bytes()])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    assert_eq!(table.memo_path(), Some(dir.path().join("notes.fpt").as_path()));

    let records: Vec<_> = table.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(records[0]["NOTE"], Value::Text("A long story".into()));
    assert_eq!(
        records[0]["PIC"],
        Value::Memo(Memo::new(MemoKind::Picture, b"\x89PNG\r\n".to_vec()))
    );
    assert_eq!(
        records[0]["OBJ"],
        Value::Memo(Memo::new(MemoKind::Object, b"OLE".to_vec()))
    );
    assert_eq!(records[0]["SCORE"], Value::Float(2.5));

    // A picture referenced from a text memo field stays binary.
    assert_eq!(
        records[1]["NOTE"],
        Value::Memo(Memo::new(MemoKind::Picture, b"\x89PNG\r\n".to_vec()))
    );
    assert_eq!(records[1]["PIC"], Value::Null);
}

#[test]
fn dbase3_memos() {
    let dir = tempfile::tempdir().unwrap();
    let long = "x".repeat(600);
    fs::write(
        dir.path().join("memo3.dbt"),
        dbt3(&[b"first memo", long.as_bytes()]),
    )
    .unwrap();

    let path = dir.path().join("memo3.dbf");
    TableBuilder::new(0x83)
        .field("TEXT", b'M', 10, 0)
        .record(b' ', &[b"         1"])
        .record(b' ', &[b"         2"])
        .record(b' ', &[b"          "])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let values: Vec<_> = table
        .iter()
        .map(|record| record.unwrap()["TEXT"].clone())
        .collect();
    assert_eq!(
        values,
        [Value::Text("first memo".into()), Value::Text(long), Value::Null]
    );
}

#[test]
fn dbase4_memos() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("MEMO4.DBT"),
        dbt4(&[b"dBase IV memo", b"second"]),
    )
    .unwrap();

    let path = dir.path().join("memo4.dbf");
    TableBuilder::new(0x8B)
        .field("TEXT", b'M', 10, 0)
        .record(b' ', &[b"         2"])
        .record(b' ', &[b"         1"])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let values: Vec<_> = table
        .iter()
        .map(|record| record.unwrap()["TEXT"].clone())
        .collect();
    assert_eq!(
        values,
        [
            Value::Text("second".into()),
            Value::Text("dBase IV memo".into())
        ]
    );
}

#[test]
fn binary_memos_outside_visual_foxpro() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blob3.dbt"), dbt3(&[b"\x00\x01binary"])).unwrap();
    let path = dir.path().join("blob3.dbf");
    TableBuilder::new(0x83)
        .field("BLOB", b'B', 10, 0)
        .record(b' ', &[b"         1"])
        .record(b' ', &[b"          "])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let values: Vec<_> = table
        .iter()
        .map(|record| record.unwrap()["BLOB"].clone())
        .collect();
    assert_eq!(
        values,
        [
            Value::Memo(Memo::new(MemoKind::Plain, b"\x00\x01binary".to_vec())),
            Value::Null
        ]
    );

    fs::write(dir.path().join("blob4.dbt"), dbt4(&[b"GIF89a"])).unwrap();
    let path = dir.path().join("blob4.dbf");
    TableBuilder::new(0x8B)
        .field("BLOB", b'B', 10, 0)
        .record(b' ', &[b"         1"])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(
        record["BLOB"],
        Value::Memo(Memo::new(MemoKind::Plain, b"GIF89a".to_vec()))
    );
}

#[test]
fn missing_memo_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lost.dbf");
    TableBuilder::new(0x30)
        .field("NAME", b'C', 4, 0)
        .field("NOTE", b'M', 4, 0)
        .record(b' ', &[b"Bob ", &1u32.to_le_bytes()])
        .write(&path);

    assert!(matches!(
        DbfTable::open(&path),
        Err(DbfError::MissingMemo(_))
    ));

    let table =
        DbfTable::open_with(&path, TableOptions::default().with_ignore_missing_memo(true))
            .unwrap();
    assert_eq!(table.memo_path(), None);
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["NAME"], Value::Text("Bob".into()));
    assert_eq!(record["NOTE"], Value::Null);
}

#[test]
fn raw_mode_returns_bytes() {
    let dir = tempfile::tempdir().unwrap();
    // The memo file is unreadable as FPT; raw mode must not open it.
    fs::write(dir.path().join("raw.fpt"), b"junk").unwrap();
    let path = dir.path().join("raw.dbf");
    TableBuilder::new(0x30)
        .field("NAME", b'C', 6, 0)
        .field("NOTE", b'M', 4, 0)
        .field("FLAG", b'L', 1, 0)
        .record(b' ', &[b"Carol ", &9u32.to_le_bytes(), b"x"])
        .write(&path);

    let table = DbfTable::open_with(&path, TableOptions::default().with_raw(true)).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["NAME"], Value::Bytes(b"Carol ".to_vec()));
    assert_eq!(record["NOTE"], Value::Bytes(9u32.to_le_bytes().to_vec()));
    assert_eq!(record["FLAG"], Value::Bytes(b"x".to_vec()));
}

#[test]
fn field_names_can_be_lowercased() {
    let dir = tempfile::tempdir().unwrap();
    let table = DbfTable::open_with(
        people(&dir),
        TableOptions::default().with_lowercase_names(true),
    )
    .unwrap();
    assert_eq!(table.field_names(), ["name", "birthdate"]);
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["name"], Value::Text("Alice".into()));
}

#[test]
fn table_lookup_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let actual = dir.path().join("PEOPLE.DBF");
    fs::rename(people(&dir), &actual).unwrap();

    let requested = dir.path().join("people.dbf");
    let table = DbfTable::open(&requested).unwrap();
    assert_eq!(table.path(), actual);
    assert_eq!(table.name(), "people");

    let strict = TableOptions::default().with_ignore_case(false);
    assert!(matches!(
        DbfTable::open_with(&requested, strict),
        Err(DbfError::NotFound(path)) if path == requested
    ));
    assert!(matches!(
        DbfTable::open(dir.path().join("nobody.dbf")),
        Err(DbfError::NotFound(_))
    ));
}

#[test]
fn bad_schemas_fail_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let open = |name: &str, tag: u8, length: u8| {
        let path = dir.path().join(name);
        TableBuilder::new(0x03).field("X", tag, length, 0).write(&path);
        DbfTable::open(&path)
    };

    assert!(matches!(
        open("int.dbf", b'I', 8),
        Err(DbfError::MalformedFieldLength { tag: 'I', expected: 4, found: 8, .. })
    ));
    assert!(matches!(
        open("bool.dbf", b'L', 2),
        Err(DbfError::MalformedFieldLength { tag: 'L', expected: 1, found: 2, .. })
    ));
    assert!(matches!(
        open("unknown.dbf", b'Q', 4),
        Err(DbfError::UnsupportedFieldType { tag: 'Q', .. })
    ));
}

/// Keeps dates as their `YYYYMMDD` text.
fn date_as_text(
    decoder: &mut FieldDecoder,
    field: &FieldDescriptor,
    data: &[u8],
) -> dbf_reader::Result<Value> {
    decoder.decode_text(field, data).map(Value::Text)
}

fn quarter(_: &mut FieldDecoder, _: &FieldDescriptor, data: &[u8]) -> dbf_reader::Result<Value> {
    Ok(Value::Integer(data.first().map_or(0, |&b| (b - b'0') as i64)))
}

#[test]
fn custom_field_decoders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dates.dbf");
    TableBuilder::new(0x03)
        .field("DAY", b'D', 8, 0)
        .field("QTR", b'Q', 1, 0)
        .record(b' ', &[b"20240230", b"3"])
        .write(&path);

    // The built-in date decoder rejects February 30th; Q is unknown.
    assert!(matches!(
        DbfTable::open(&path),
        Err(DbfError::UnsupportedFieldType { tag: 'Q', .. })
    ));

    let options = TableOptions::default()
        .with_decoder('D', date_as_text)
        .with_decoder('Q', quarter);
    let table = DbfTable::open_with(&path, options.clone()).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["DAY"], Value::Text("20240230".into()));
    assert_eq!(record["QTR"], Value::Integer(3));

    // Preloaded tables decode through the same overrides.
    let table = DbfTable::open_with(&path, options.with_preload(true)).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["DAY"], Value::Text("20240230".into()));

    let only_q = TableOptions::default().with_decoder('Q', quarter);
    let table = DbfTable::open_with(&path, only_q).unwrap();
    assert!(matches!(table.iter().next(), Some(Err(DbfError::Decode { .. }))));
}

#[test]
fn long_character_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.dbf");
    let body = "y".repeat(290);
    TableBuilder::new(0x03)
        .field("BODY", b'C', 0x2C, 0x01)
        .field("N", b'N', 2, 0)
        .record(b' ', &[&text(&body, 300), b"42"])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    assert_eq!(table.fields()[0].length, 300);
    assert_eq!(table.fields()[0].decimal_count, 0);
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["BODY"], Value::Text(body));
    assert_eq!(record["N"], Value::Integer(42));
}

#[test]
fn mixed_field_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.dbf");
    let mut timestamp = 2_460_385u32.to_le_bytes().to_vec(); // 2024-03-15
    timestamp.extend_from_slice(&45_296_000u32.to_le_bytes()); // 12:34:56
    TableBuilder::new(0x30)
        .field("ID", b'I', 4, 0)
        .field("PRICE", b'Y', 8, 0)
        .field("RATE", b'N', 6, 2)
        .field("OK", b'L', 1, 0)
        .field("SEEN", b'T', 8, 0)
        .field("SINCE", b'D', 8, 0)
        .record(
            b' ',
            &[
                &7i32.to_le_bytes(),
                &12345i64.to_le_bytes(),
                b"  1.25",
                b"T",
                &timestamp,
                b"        ",
            ],
        )
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["ID"], Value::Integer(7));
    assert_eq!(record["PRICE"].to_string(), "1.2345");
    assert_eq!(record["RATE"], Value::Float(1.25));
    assert_eq!(record["OK"], Value::Bool(true));
    assert_eq!(
        record["SEEN"],
        Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(12, 34, 56)
                .unwrap()
        )
    );
    assert_eq!(record["SINCE"], Value::Null);
}

#[test]
fn decode_errors_stop_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.dbf");
    TableBuilder::new(0x03)
        .field("OK", b'L', 1, 0)
        .record(b' ', &[b"x"])
        .record(b' ', &[b"T"])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    let mut iter = table.iter();
    assert!(matches!(iter.next(), Some(Err(DbfError::Decode { .. }))));
    assert!(iter.next().is_none());

    // Counting never decodes.
    assert_eq!(table.len().unwrap(), 2);
}

#[test]
fn truncated_records_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.dbf");
    let mut data = TableBuilder::new(0x03)
        .field("NAME", b'C', 8, 0)
        .record(b' ', &[b"Dave    "])
        .without_end_marker()
        .build();
    data.truncate(data.len() - 3);
    fs::write(&path, data).unwrap();

    let table = DbfTable::open(&path).unwrap();
    assert!(matches!(table.iter().next(), Some(Err(DbfError::Io(_)))));
}

#[test]
fn encodings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enc.dbf");
    TableBuilder::new(0x03)
        .language_driver(0x03)
        .field("CITY", b'C', 6, 0)
        .record(b' ', &[b"Caf\xe9  "])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    assert_eq!(table.encoding().name(), "windows-1252");
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["CITY"], Value::Text("Café".into()));

    // An explicit ascii override makes the same byte undecodable.
    let ascii = TableOptions::default().with_encoding("ascii");
    let table = DbfTable::open_with(&path, ascii.clone()).unwrap();
    assert!(matches!(table.iter().next(), Some(Err(DbfError::Decode { .. }))));

    let replace = ascii.with_char_decode_errors(CharDecodeErrors::Replace);
    let table = DbfTable::open_with(&path, replace).unwrap();
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["CITY"], Value::Text("Caf\u{fffd}".into()));

    assert!(matches!(
        DbfTable::open_with(&path, TableOptions::default().with_encoding("no-such-codec")),
        Err(DbfError::UnknownEncoding(label)) if label == "no-such-codec"
    ));
}

#[test]
fn dos_codepage_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dos.dbf");
    TableBuilder::new(0x03)
        .language_driver(0x01)
        .field("CITY", b'C', 6, 0)
        .record(b' ', &[b"caf\x82  "])
        .write(&path);

    let table = DbfTable::open(&path).unwrap();
    assert_eq!(table.encoding().name(), "cp437");
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["CITY"], Value::Text("café".into()));

    // Naming a DOS codepage explicitly works too; 0x82 is also é in cp850.
    let table =
        DbfTable::open_with(&path, TableOptions::default().with_encoding("cp850")).unwrap();
    assert_eq!(table.encoding().name(), "cp850");
    let record = table.iter().next().unwrap().unwrap();
    assert_eq!(record["CITY"], Value::Text("café".into()));
}

#[test]
fn custom_record_factories() {
    let dir = tempfile::tempdir().unwrap();
    let path = people(&dir);

    let pairs = DbfTable::open_with_factory(&path, TableOptions::default(), PairsFactory).unwrap();
    let record = pairs.iter().next().unwrap().unwrap();
    assert_eq!(record[0], ("NAME".to_string(), Value::Text("Alice".into())));

    let names = DbfTable::open_with_factory(
        &path,
        TableOptions::default().with_preload(true),
        |fields: Vec<(String, Value)>| {
            fields
                .into_iter()
                .find(|(name, _)| name == "NAME")
                .and_then(|(_, value)| value.as_str().map(str::to_owned))
        },
    )
    .unwrap();
    let active: Vec<_> = names.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(active, [Some("Alice".to_string())]);
    let deleted: Vec<_> = names.iter_deleted().collect::<Result<_, _>>().unwrap();
    assert_eq!(deleted, [Some("Deleted Guy".to_string())]);
}
