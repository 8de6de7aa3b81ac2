//! Page fetcher capability and its HTTP implementation
//!
//! This module handles retrieving listing pages, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Keeping one client per session id so a run reuses its connections
//! - Classifying failures as transient (worth a retry) or not
//! - Narrowing the page to the product blocks matched by the CSS selector

use crate::config::FetcherConfig;
use crate::crawler::parser::listing_content;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::Selector;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page retrieved; holds the matched product blocks (possibly empty)
    Content(String),

    /// Page could not be retrieved
    Failed {
        /// Error description
        reason: String,
        /// Whether trying again later might succeed
        transient: bool,
    },
}

impl FetchOutcome {
    pub fn failed(reason: impl Into<String>, transient: bool) -> Self {
        Self::Failed {
            reason: reason.into(),
            transient,
        }
    }
}

/// Retrieves the product blocks of one listing page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the content matched by `selector`
    ///
    /// Implementations may cache per-session context (connections, cookies,
    /// a browser tab) under `session_id`; callers pass the same id for every
    /// page of a run.
    async fn fetch(&self, url: &Url, selector: &str, session_id: &str) -> FetchOutcome;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::FetcherConfig;
/// use listing_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP page fetcher
///
/// Fetches server-rendered listing pages with `reqwest` and selects product
/// blocks with `scraper`. Pages that need JavaScript to render their listing
/// are out of reach for this fetcher.
pub struct HttpFetcher {
    config: FetcherConfig,
    sessions: Mutex<HashMap<String, Client>>,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions opened so far
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns the client for `session_id`, creating it on first use
    fn session(&self, session_id: &str) -> Result<Client, String> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| "session cache poisoned".to_string())?;

        if let Some(client) = sessions.get(session_id) {
            return Ok(client.clone());
        }

        let client = build_http_client(&self.config).map_err(|e| e.to_string())?;
        tracing::debug!("Opened fetch session '{}'", session_id);
        sessions.insert(session_id.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a listing page
    ///
    /// # Failure classification
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout / connection error | yes |
    /// | HTTP 429 | yes |
    /// | HTTP 5xx | yes |
    /// | Other non-2xx | no |
    /// | Body read error | yes |
    /// | Invalid selector | no |
    async fn fetch(&self, url: &Url, selector: &str, session_id: &str) -> FetchOutcome {
        if let Err(failure) = parse_selector(selector) {
            return failure;
        }

        let client = match self.session(session_id) {
            Ok(c) => c,
            Err(e) => return FetchOutcome::failed(format!("Failed to open session: {}", e), false),
        };

        let response = match client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                return FetchOutcome::failed(reason, true);
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return FetchOutcome::failed(format!("HTTP {}", status.as_u16()), true);
        }
        if !status.is_success() {
            return FetchOutcome::failed(format!("HTTP {}", status.as_u16()), false);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return FetchOutcome::failed(e.to_string(), true),
        };

        // Parsed again here so no selector is held across an await point
        match parse_selector(selector) {
            Ok(selector) => FetchOutcome::Content(listing_content(&body, &selector)),
            Err(failure) => failure,
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, FetchOutcome> {
    Selector::parse(selector)
        .map_err(|e| FetchOutcome::failed(format!("Invalid selector: {:?}", e), false))
}
