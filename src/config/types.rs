use crate::record::{RecordSchema, DEFAULT_REQUIRED_FIELDS};
use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Category listing URL; the page number is appended as a query pair
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// CSS selector matching one product block
    #[serde(rename = "css-selector")]
    pub css_selector: String,

    /// Name of the query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Identifier under which the fetcher keeps its per-run context
    #[serde(rename = "session-id", default = "default_session_id")]
    pub session_id: String,

    /// Pause between consecutive pages (milliseconds)
    #[serde(rename = "page-delay", default = "default_page_delay")]
    pub page_delay: u64,

    /// Literal text the listing shows once the catalog is exhausted
    #[serde(rename = "no-results-marker", default = "default_no_results_marker")]
    pub no_results_marker: String,

    /// How many times a page is retried after a transient failure
    #[serde(rename = "max-fetch-retries", default = "default_max_fetch_retries")]
    pub max_fetch_retries: u32,

    /// Pause before retrying a failed page (milliseconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Stop after this many completed pages in one run
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

/// Record schema configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// Fields every record must carry, in output column order
    #[serde(rename = "required-fields", default = "default_required_fields")]
    pub required_fields: Vec<String>,
}

impl SchemaConfig {
    pub fn record_schema(&self) -> RecordSchema {
        RecordSchema::new(self.required_fields.iter().cloned())
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            required_fields: default_required_fields(),
        }
    }
}

/// HTTP page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

/// LLM-backed structured extractor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub temperature: f32,

    /// Maximum bytes of page content sent in one request
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Extraction instruction given to the model
    #[serde(default = "default_instruction")]
    pub instruction: String,

    /// Request timeout (seconds)
    #[serde(default = "default_extractor_timeout")]
    pub timeout: u64,
}

/// How accepted records reach the CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushMode {
    /// Buffer the whole run and append once when the crawl stops
    #[default]
    EndOfRun,
    /// Append each page's records as soon as the page completes
    PerPage,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV file records are appended to
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Path to the file holding the last completed page
    #[serde(rename = "resume-path", default = "default_resume_path")]
    pub resume_path: String,

    #[serde(default)]
    pub flush: FlushMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            resume_path: default_resume_path(),
            flush: FlushMode::default(),
        }
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_session_id() -> String {
    "listing_crawl_session".to_string()
}

fn default_page_delay() -> u64 {
    2000
}

fn default_no_results_marker() -> String {
    "No Results Found".to_string()
}

fn default_max_fetch_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_required_fields() -> Vec<String> {
    DEFAULT_REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_user_agent() -> String {
    format!("listing-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_chunk_size() -> usize {
    12_000
}

fn default_extractor_timeout() -> u64 {
    120
}

fn default_instruction() -> String {
    "Extract every product from the following content. For each product return \
     an object with exactly the requested fields as string values: name, price, \
     discount, rating, category, stock_availability and a one sentence description. \
     Respond with a JSON array of objects and nothing else."
        .to_string()
}

fn default_csv_path() -> String {
    "extracted_details.csv".to_string()
}

fn default_resume_path() -> String {
    "last_page.txt".to_string()
}
