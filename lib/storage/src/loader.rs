//! Startup dataset loading.
//!
//! The dataset is comma-delimited text with a header line. Only a bounded
//! prefix is read. Rows are addressed by position:
//!
//! | column | meaning  |
//! |--------|----------|
//! | 5      | date     |
//! | 7      | address  |
//! | 8      | severity |
//! | 9      | class    |
//! | 10     | locality |
//!
//! Rows with fewer than [`MIN_FIELDS`] fields are skipped. Splitting drops
//! trailing empty fields, so a row whose last columns are blank counts as
//! short.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vialert_core::Result;

/// Maximum number of data lines read after the header.
pub const DATASET_LIMIT: usize = 100;

/// Minimum number of fields for a row to be usable.
pub const MIN_FIELDS: usize = 11;

pub const DELIMITER: char = ',';

const COL_DATE: usize = 5;
const COL_ADDRESS: usize = 7;
const COL_SEVERITY: usize = 8;
const COL_CLASS: usize = 9;
const COL_LOCALITY: usize = 10;

/// A usable dataset row: the text to embed plus the fields to store.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub description: String,
    pub date: String,
    pub address: String,
    pub accident_type: String,
}

/// Builds the text that gets embedded for an accident.
pub fn describe(class: &str, severity: &str, locality: &str, address: &str) -> String {
    format!("{} con {} en {}, {}", class, severity, locality, address)
}

/// Split a line on the delimiter, dropping trailing empty fields.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(DELIMITER).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Turn one line into a row, or `None` if it is too short.
///
/// The description reads columns 7/8/9/10 (trimmed) while the stored fields
/// come from columns 5/7/9 as they appear in the file.
pub fn parse_row(line: &str) -> Option<DatasetRow> {
    let fields = split_fields(line);
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let description = describe(
        fields[COL_CLASS].trim(),
        fields[COL_SEVERITY].trim(),
        fields[COL_LOCALITY].trim(),
        fields[COL_ADDRESS].trim(),
    );

    Some(DatasetRow {
        description,
        date: fields[COL_DATE].to_string(),
        address: fields[COL_ADDRESS].to_string(),
        accident_type: fields[COL_CLASS].to_string(),
    })
}

/// Decode one raw line, replacing invalid UTF-8 and dropping a trailing `\r`.
fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    String::from_utf8_lossy(&raw).into_owned()
}

/// Read the header plus up to `limit` lines and keep the valid rows.
///
/// Bytes that are not valid UTF-8 become U+FFFD; only read failures are
/// errors.
pub fn parse_dataset<R: BufRead>(reader: R, limit: usize) -> Result<Vec<DatasetRow>> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for raw in reader.split(b'\n').skip(1).take(limit) {
        let line = decode_line(raw?);
        match parse_row(&line) {
            Some(row) => rows.push(row),
            None => {
                skipped += 1;
                debug!("Skipping malformed dataset row: {:?}", line);
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed dataset rows", skipped);
    }
    Ok(rows)
}

/// Reads the accident dataset from disk
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    path: PathBuf,
    limit: usize,
}

impl DatasetLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limit: DATASET_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the dataset. Fails if the file cannot be opened or read.
    pub fn load(&self) -> Result<Vec<DatasetRow>> {
        let file = File::open(&self.path)?;
        let rows = parse_dataset(BufReader::new(file), self.limit)?;
        info!("Read {} dataset rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}
