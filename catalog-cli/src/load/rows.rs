//! CSV rows keyed by the header line

use anyhow::{Context, Result};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One data row as ordered (column, value) pairs.
///
/// Values are kept exactly as they appear in the file. When a header name is
/// repeated, the later column's value wins and keeps the first position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvRow {
    fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let mut row = CsvRow::default();
        for (name, value) in headers.iter().zip(record.iter()) {
            row.insert(name, value);
        }
        row
    }

    fn insert(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A row together with the line it started on, for diagnostics
#[derive(Debug, Clone)]
pub struct NumberedRow {
    pub line: u64,
    pub row: CsvRow,
}

/// Open CSV source whose first line is the header
pub struct CsvSource<R: Read> {
    headers: StringRecord,
    reader: Reader<R>,
}

impl CsvSource<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to read CSV header: {}", path.display()))
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        Ok(Self { headers, reader })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Remaining rows. A record whose field count differs from the header
    /// yields an error naming its line. Short records are not padded with
    /// missing values the way a dictionary reader would pad them; uploading
    /// such a row would create a document with silently absent fields.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<NumberedRow>> + '_ {
        let headers = &self.headers;
        self.reader.records().map(move |record| {
            let record = record.context("Malformed CSV record")?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            Ok(NumberedRow {
                line,
                row: CsvRow::from_record(headers, &record),
            })
        })
    }
}
