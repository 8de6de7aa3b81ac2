use crate::record::RawRecord;

/// Field names every product record must carry, in output column order
pub const DEFAULT_REQUIRED_FIELDS: [&str; 7] = [
    "name",
    "price",
    "discount",
    "rating",
    "category",
    "stock_availability",
    "description",
];

/// Ordered set of required field names
///
/// The order is significant: it is the column order of the CSV output and
/// the field order presented to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<String>,
}

impl RecordSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// True iff every required field is present as a key
    ///
    /// Values are not inspected; an empty string counts as present.
    pub fn is_complete(&self, raw: &RawRecord) -> bool {
        self.fields.iter().all(|field| raw.contains_key(field))
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_FIELDS)
    }
}
