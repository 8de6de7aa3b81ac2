//! Listing-Harvest: a resumable catalog listing harvester
//!
//! This crate walks a paginated category listing page by page, hands the
//! matched product blocks to a structured extractor, drops incomplete and
//! duplicate records, and appends the survivors to a CSV file. Progress is
//! recorded after every completed page so an interrupted run picks up where
//! it left off.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to persist resume state to {path}: {source}")]
    ResumeState {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use record::{RawRecord, Record, RecordSchema};
pub use state::{CrawlState, ResumeStore, SeenNames};
