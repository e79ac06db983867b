//! Book dumps: JSON lines, or the comma-separated Kaggle bestsellers file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};

use crate::books::model::{BookRecord, RawBook};
use crate::error::{BsError, Result};

/// Records read from a dump, with the count of rows that needed fallback
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedBooks {
    pub records: Vec<BookRecord>,
    pub validation_errors: usize,
}

impl LoadedBooks {
    fn push(&mut self, raw: &RawBook) {
        let (record, valid) = BookRecord::from_raw(self.records.len(), raw);
        if !valid {
            self.validation_errors += 1;
        }
        self.records.push(record);
    }
}

/// Read a dump, picking the format from the extension: `.csv` is
/// comma-separated, anything else is JSON lines.
pub fn read_books(path: &Path) -> Result<LoadedBooks> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv { read_csv(path) } else { read_jsonl(path) }
}

pub fn read_jsonl(path: &Path) -> Result<LoadedBooks> {
    let file = File::open(path)?;
    parse_jsonl(BufReader::new(file)).map_err(|err| with_path(err, path))
}

pub fn read_csv(path: &Path) -> Result<LoadedBooks> {
    let file = File::open(path)?;
    parse_csv(BufReader::new(file)).map_err(|err| with_path(err, path))
}

fn with_path(err: BsError, path: &Path) -> BsError {
    match err {
        BsError::Import(msg) => BsError::Import(format!("{}: {msg}", path.display())),
        other => other,
    }
}

/// One JSON object per line; blank lines are skipped. Ids are assigned in
/// row order starting at 0.
pub fn parse_jsonl(reader: impl BufRead) -> Result<LoadedBooks> {
    let mut loaded = LoadedBooks::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawBook = serde_json::from_str(&line)
            .map_err(|err| BsError::Import(format!("line {}: {err}", line_no + 1)))?;
        loaded.push(&raw);
    }
    Ok(loaded)
}

/// A header row followed by one book per row. Cells reach [`RawBook`] as
/// strings and are parsed during validation; empty cells count as missing.
pub fn parse_csv(reader: impl Read) -> Result<LoadedBooks> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| BsError::Import(format!("header: {err}")))?
        .clone();

    let mut loaded = LoadedBooks::default();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|err| BsError::Import(format!("row {}: {err}", row + 1)))?;
        let cells: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        let raw: RawBook = serde_json::from_value(Value::Object(cells))
            .map_err(|err| BsError::Import(format!("row {}: {err}", row + 1)))?;
        loaded.push(&raw);
    }
    Ok(loaded)
}
