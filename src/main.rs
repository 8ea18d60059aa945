use dbf_reader::{DbfTable, TableOptions, codepages};
use std::env;

const SAMPLE_SIZE: usize = 10;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-dbf-file> [--encoding <LABEL>] [--deleted] [--raw] [--ignore-missing-memo]",
            args[0]
        );
        std::process::exit(1);
    }

    let dbf_path = &args[1];
    let mut options = TableOptions::default()
        .with_raw(args.iter().any(|arg| arg == "--raw"))
        .with_ignore_missing_memo(args.iter().any(|arg| arg == "--ignore-missing-memo"));
    let show_deleted = args.iter().any(|arg| arg == "--deleted");

    if let Some(idx) = args.iter().position(|arg| arg == "--encoding") {
        match args.get(idx + 1) {
            Some(label) => options = options.with_encoding(label.as_str()),
            None => {
                eprintln!("ERROR: --encoding flag requires an argument.");
                std::process::exit(1);
            }
        }
    }

    println!("Reading DBF table: {}", dbf_path);
    println!("{}", "=".repeat(60));

    let table = match DbfTable::open_with(dbf_path, options) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("\nERROR: Failed to open DBF table");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("\nTable Information:");
    println!("  Name: {}", table.name());
    println!("  Version: {} ({:#04x})", table.version_name(), table.version());
    println!(
        "  Language driver: {:#04x} ({})",
        table.header.language_driver,
        codepages::codepage_description(table.header.language_driver).unwrap_or("unknown")
    );
    println!("  Encoding: {}", table.encoding());
    match table.date() {
        Some(date) => println!("  Last modified: {}", date),
        None => println!("  Last modified: (invalid)"),
    }
    if let Some(memo) = table.memo_path() {
        println!("  Memo file: {}", memo.display());
    }

    println!("\nFields:");
    for field in table.fields() {
        println!(
            "  {:<11} {} {:>5} {:>3}",
            field.name, field.field_type, field.length, field.decimal_count
        );
    }

    let (records, deleted) = match (table.len(), table.deleted_len()) {
        (Ok(records), Ok(deleted)) => (records, deleted),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("\nERROR: Failed to count records");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    println!("\nStatistics:");
    println!("  Records: {}", records);
    println!("  Deleted records: {}", deleted);

    let (label, iter, total) = if show_deleted {
        ("Deleted Records", table.iter_deleted(), deleted)
    } else {
        ("Records", table.iter(), records)
    };

    println!("\nSample {} (first {}):", label, SAMPLE_SIZE);
    for (i, result) in iter.take(SAMPLE_SIZE).enumerate() {
        match result {
            Ok(record) => {
                let values: Vec<String> = record
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect();
                println!("  {}. {}", i + 1, values.join(", "));
            }
            Err(e) => {
                eprintln!("\nERROR: Failed to read record {}", i + 1);
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        }
    }

    if total > SAMPLE_SIZE {
        println!("  ... and {} more", total - SAMPLE_SIZE);
    }
}
