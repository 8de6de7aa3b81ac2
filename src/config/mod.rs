//! Configuration module for Listing-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("listing-harvest.toml")).unwrap();
//! println!("Crawling {}", config.crawler.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, FlushMode, OutputConfig, SchemaConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
