//! Extracted product records
//!
//! A record is a flat mapping from field name to string value. The extractor
//! produces [`RawRecord`]s; only those that pass [`RecordSchema::is_complete`]
//! become [`Record`]s and travel further through the pipeline.

mod schema;

pub use schema::{RecordSchema, DEFAULT_REQUIRED_FIELDS};

use std::collections::HashMap;

/// Field mapping exactly as returned by the structured extractor
pub type RawRecord = HashMap<String, String>;

/// A complete record: every field of the schema it was validated against is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Validates a raw mapping against the schema
    ///
    /// Returns `None` when any required field is missing. Fields outside the
    /// schema are carried along but never written.
    pub fn from_raw(raw: RawRecord, schema: &RecordSchema) -> Option<Self> {
        if schema.is_complete(&raw) {
            Some(Self { fields: raw })
        } else {
            None
        }
    }

    /// The record's dedup key
    pub fn name(&self) -> &str {
        self.get("name").unwrap_or_default()
    }

    /// Looks up a single field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Values in schema order, ready to be written as a row
    pub fn row<'a>(&'a self, schema: &'a RecordSchema) -> Vec<&'a str> {
        schema
            .fields()
            .iter()
            .map(|field| self.get(field).unwrap_or_default())
            .collect()
    }
}
