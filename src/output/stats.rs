//! Run statistics
//!
//! This module provides the counters collected during a crawl run and the
//! functions that print them, along with extractor usage.

use crate::crawler::{CrawlReport, Usage};
use crate::state::CrawlState;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages whose records were accepted
    pub pages_completed: u32,

    /// Records that passed completeness and dedup filtering
    pub records_accepted: usize,

    /// Mappings dropped for missing a required field
    pub incomplete_dropped: usize,

    /// Mappings dropped because the name had already been seen this run
    pub duplicates_dropped: usize,

    /// Pages re-requested after a transient failure
    pub fetch_retries: u32,

    /// State the crawl loop ended in
    pub final_state: CrawlState,

    pub elapsed: Duration,
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self {
            pages_completed: 0,
            records_accepted: 0,
            incomplete_dropped: 0,
            duplicates_dropped: 0,
            fetch_retries: 0,
            final_state: CrawlState::Running,
            elapsed: Duration::ZERO,
        }
    }
}

/// Prints the outcome of a run followed by its statistics
pub fn print_report(report: &CrawlReport) {
    if report.records_saved > 0 {
        println!(
            "Saved {} records to '{}'.",
            report.records_saved, report.destination
        );
    } else {
        println!("No records were found during the crawl.");
    }
    match report.last_completed_page {
        Some(page) => println!("Last completed page: {}", page),
        None => println!("No pages completed (started at page {}).", report.first_page),
    }
    println!();

    print_statistics(&report.stats);
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages completed: {}", stats.pages_completed);
    println!("  Records accepted: {}", stats.records_accepted);
    println!("  Stopped: {}", stats.final_state.describe());
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    println!();

    println!("Filtered:");
    println!("  Incomplete records: {}", stats.incomplete_dropped);
    println!("  Duplicate records: {}", stats.duplicates_dropped);
    println!("  Fetch retries: {}", stats.fetch_retries);
    println!();
}

/// Prints extractor usage to stdout
pub fn print_usage(usage: &Usage) {
    tracing::info!(
        "Extractor usage: {} requests, {} total tokens",
        usage.requests,
        usage.total_tokens
    );

    println!("=== Extraction Usage ===\n");
    println!("  Requests: {}", usage.requests);
    println!("  Prompt tokens: {}", usage.prompt_tokens);
    println!("  Completion tokens: {}", usage.completion_tokens);
    println!("  Total tokens: {}", usage.total_tokens);
    println!();
}
