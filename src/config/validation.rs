use crate::config::types::{
    Config, CrawlerConfig, ExtractorConfig, FetcherConfig, OutputConfig, SchemaConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

const MAX_FETCH_RETRIES: u32 = 10;
const MIN_CHUNK_SIZE: usize = 500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_schema_config(&config.schema)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;

    Selector::parse(&config.css_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {:?}", config.css_selector, e))
    })?;

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page-param cannot be empty".to_string(),
        ));
    }

    if config.session_id.is_empty() {
        return Err(ConfigError::Validation(
            "session-id cannot be empty".to_string(),
        ));
    }

    if config.no_results_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "no-results-marker cannot be blank".to_string(),
        ));
    }

    if config.max_fetch_retries > MAX_FETCH_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-fetch-retries must be <= {}, got {}",
            MAX_FETCH_RETRIES, config.max_fetch_retries
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the record schema: non-empty, keyed by `name`, no repeats
fn validate_schema_config(config: &SchemaConfig) -> Result<(), ConfigError> {
    if config.required_fields.is_empty() {
        return Err(ConfigError::Validation(
            "required-fields cannot be empty".to_string(),
        ));
    }

    if !config.required_fields.iter().any(|f| f == "name") {
        return Err(ConfigError::Validation(
            "required-fields must include 'name' (used for deduplication)".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in &config.required_fields {
        if field.trim().is_empty() {
            return Err(ConfigError::Validation(
                "required-fields cannot contain blank names".to_string(),
            ));
        }
        if !seen.insert(field.as_str()) {
            return Err(ConfigError::Validation(format!(
                "required-fields lists '{}' more than once",
                field
            )));
        }
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "fetcher timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    validate_http_url("endpoint", &config.endpoint)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "extractor model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api-key-env cannot be empty".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.chunk_size < MIN_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "chunk-size must be >= {}, got {}",
            MIN_CHUNK_SIZE, config.chunk_size
        )));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "extractor timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    if config.resume_path.is_empty() {
        return Err(ConfigError::Validation(
            "resume-path cannot be empty".to_string(),
        ));
    }

    if config.csv_path == config.resume_path {
        return Err(ConfigError::Validation(
            "csv-path and resume-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Parses `value` and requires an http(s) scheme
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}
