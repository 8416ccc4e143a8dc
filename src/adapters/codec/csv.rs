//! CSV row codec
//!
//! The header is taken from the first row written. Every later row is
//! written in header order: a column the row lacks is written empty, a
//! column the header lacks is rejected.

use crate::adapters::codec::traits::{RowCodec, RowReader, RowWriter};
use crate::domain::{QuireError, Result, Row};
use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// CSV implementation of [`RowCodec`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl CsvCodec {
    /// Creates the codec
    pub fn new() -> Self {
        Self
    }
}

impl RowCodec for CsvCodec {
    fn writer(&self, path: &Path) -> Result<Box<dyn RowWriter>> {
        let file = File::create(path).map_err(|e| {
            QuireError::Codec(format!("Failed to create {}: {e}", path.display()))
        })?;
        let writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));

        Ok(Box::new(CsvRowWriter {
            writer,
            path: path.to_path_buf(),
            header: None,
            rows: 0,
        }))
    }

    fn reader(&self, path: &Path) -> Result<RowReader> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| QuireError::Codec(format!("Failed to open {}: {e}", path.display())))?;
        let headers = reader.headers()?.clone();

        Ok(Box::new(reader.into_records().map(move |record| -> Result<Row> {
            let record = record?;
            Ok(Row::from_pairs(headers.iter().zip(record.iter())))
        })))
    }
}

struct CsvRowWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    header: Option<Vec<String>>,
    rows: u64,
}

impl CsvRowWriter {
    fn ordered_record(header: &[String], row: &Row) -> Result<StringRecord> {
        if let Some(unknown) = row.columns().find(|c| !header.iter().any(|h| h == c)) {
            return Err(QuireError::Validation(format!(
                "Column '{unknown}' is not in the file header"
            )));
        }
        Ok(header
            .iter()
            .map(|column| row.get(column).unwrap_or(""))
            .collect())
    }
}

impl RowWriter for CsvRowWriter {
    fn add_row(&mut self, row: &Row) -> Result<()> {
        if self.header.is_none() {
            if row.is_empty() {
                return Err(QuireError::Validation(
                    "Cannot derive a header from a row with no fields".to_string(),
                ));
            }
            let header: Vec<String> = row.columns().map(str::to_string).collect();
            self.writer.write_record(&header)?;
            self.header = Some(header);
        }

        let header = self.header.as_deref().unwrap_or_default();
        let record = Self::ordered_record(header, row)?;
        self.writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<u64> {
        let CsvRowWriter { writer, path, rows, .. } = *self;
        let buffered = writer.into_inner().map_err(|e| {
            QuireError::Codec(format!("Failed to flush {}: {}", path.display(), e.error()))
        })?;
        let file = buffered.into_inner().map_err(|e| {
            QuireError::Codec(format!("Failed to flush {}: {}", path.display(), e.error()))
        })?;
        file.sync_all()?;
        Ok(rows)
    }
}
