//! CSV result sink
//!
//! Rows are appended to a single CSV file. The header is written only when
//! the file did not exist before the call, so repeated runs keep extending
//! one table.

use crate::output::traits::ResultSink;
use crate::record::{Record, RecordSchema};
use crate::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Appends records to a CSV file in schema column order
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    schema: RecordSchema,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, schema: RecordSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn append(&mut self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            tracing::info!("No records to save.");
            return Ok(0);
        }

        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !file_exists {
            writer.write_record(self.schema.fields())?;
        }

        for record in records {
            writer.write_record(record.row(&self.schema))?;
        }
        writer.flush()?;

        tracing::info!(
            "Appended {} records to '{}'.",
            records.len(),
            self.path.display()
        );
        Ok(records.len())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}
