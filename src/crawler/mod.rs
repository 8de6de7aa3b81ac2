//! Crawler module for walking a paginated listing
//!
//! This module contains the core crawling logic, including:
//! - The page fetcher capability and its HTTP implementation
//! - The structured extractor capability and its LLM implementation
//! - Per-page processing (terminal signals, completeness, dedup)
//! - Overall crawl coordination and resume handling

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod processor;


pub use coordinator::{Coordinator, CrawlReport, CrawlSettings};
pub use extractor::{chunk_content, parse_records, LlmExtractor, StructuredExtractor, Usage};
pub use fetcher::{build_http_client, FetchOutcome, HttpFetcher, PageFetcher};
pub use parser::{listing_content, select_blocks, visible_text};
pub use processor::{accept_records, ListingTarget, PageFailure, PageOutcome, PageProcessor};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher, LLM extractor and CSV sink
/// 2. Pick the first page from the resume state (or page 1 when `fresh`)
/// 3. Process pages until the listing is exhausted or a page comes back empty
/// 4. Flush accepted records and report extractor usage
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::load_config;
/// use listing_harvest::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("listing-harvest.toml"))?;
/// let report = crawl(&config, false).await?;
/// println!("Saved {} records", report.records_saved);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, fresh: bool) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::from_config(config)?;
    coordinator.run(fresh).await
}
