//! Output module for persisting records and reporting on a run
//!
//! This module handles:
//! - Appending accepted records to the CSV destination
//! - Recording and printing run statistics and extractor usage

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use stats::{print_report, print_statistics, print_usage, CrawlStatistics};
pub use traits::ResultSink;
