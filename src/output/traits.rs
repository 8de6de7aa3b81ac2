//! Result sink trait
//!
//! A sink is where accepted records end up. The crawl loop only ever appends;
//! it never reads back or rewrites what a sink already holds.

use crate::record::Record;
use crate::Result;

/// Durable destination for accepted records
pub trait ResultSink {
    /// Appends `records` in order and returns how many rows were written
    ///
    /// An empty slice is a no-op that returns 0.
    fn append(&mut self, records: &[Record]) -> Result<usize>;

    /// Human-readable name of the destination, for progress messages
    fn destination(&self) -> String;
}
