//! CSV discovery and loading.

use crate::error::{Error, Result};
use glob::glob;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One parsed CSV file: the header plus every data row, in file order. Rows
/// may be shorter or longer than the header.
#[derive(Debug)]
pub struct Table {
    pub path: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Expand `loc` into the list of files to process: a file passes through, a
/// directory expands to its `*.csv` entries in lexicographic order so
/// repeated runs see the same sequence.
pub fn discover(loc: &Path) -> Result<Vec<PathBuf>> {
    if loc.is_file() {
        return Ok(vec![loc.to_path_buf()]);
    }
    if !loc.is_dir() {
        return Err(Error::InvalidPath {
            path: loc.to_path_buf(),
        });
    }
    let pattern = loc.join("*.csv");
    let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())
        .map_err(|_| Error::InvalidPath {
            path: loc.to_path_buf(),
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    debug!(dir = %loc.display(), files = files.len(), "expanded directory");
    Ok(files)
}

/// Read a whole file into memory. The first record becomes the header; the
/// reader is flexible, so records are not forced to the header's field count.
pub fn load(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|source| Error::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::MalformedTable {
            path: path.to_path_buf(),
            source,
        })?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if header.is_none() {
            header = Some(fields);
        } else {
            rows.push(fields);
        }
    }
    let header = header.ok_or_else(|| Error::MissingHeader {
        path: path.to_path_buf(),
    })?;
    debug!(path = %path.display(), columns = header.len(), rows = rows.len(), "loaded table");
    Ok(Table {
        path: path.to_path_buf(),
        header,
        rows,
    })
}
