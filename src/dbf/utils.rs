//! File lookup helpers.

use std::fs;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when looking for a table's memo file.
const MEMO_EXTENSIONS: [&str; 2] = ["fpt", "dbt"];

/// Finds `path` ignoring the case of its file name.
///
/// With `ext`, the extension of `path` is replaced first. An exact match
/// wins; otherwise the first case-insensitive match (by sorted name) in the
/// parent directory is returned.
pub fn ifind(path: &Path, ext: Option<&str>) -> Option<PathBuf> {
    let wanted = match ext {
        Some(ext) => path.with_extension(ext),
        None => path.to_path_buf(),
    };
    if wanted.is_file() {
        return Some(wanted);
    }

    let name = wanted.file_name()?.to_str()?;
    let parent = match wanted.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut matches: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        })
        .map(|entry| entry.path())
        .filter(|candidate| candidate.is_file())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Looks for a `.fpt`, then a `.dbt` file next to the table.
pub fn find_memo_file(table: &Path) -> Option<PathBuf> {
    MEMO_EXTENSIONS.iter().find_map(|ext| ifind(table, Some(ext)))
}
