//! Single-page processing
//!
//! One call handles one listing page end to end: fetch, terminal-signal
//! classification, extraction, completeness and duplicate filtering.

use crate::crawler::extractor::StructuredExtractor;
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::record::{RawRecord, Record, RecordSchema};
use crate::state::{PageNumber, SeenNames};
use std::fmt;
use url::Url;

/// Where and how to find product blocks on the listing
#[derive(Debug, Clone)]
pub struct ListingTarget {
    pub base_url: Url,
    pub page_param: String,
    pub css_selector: String,
    pub session_id: String,
    pub no_results_marker: String,
}

impl ListingTarget {
    /// URL of page `page`: the base URL with `<page_param>=<page>` appended
    ///
    /// # Example
    ///
    /// ```
    /// use listing_harvest::crawler::ListingTarget;
    /// use url::Url;
    ///
    /// let target = ListingTarget {
    ///     base_url: Url::parse("https://shop.example.com/pc/home-appliances/").unwrap(),
    ///     page_param: "page".to_string(),
    ///     css_selector: "div.sku".to_string(),
    ///     session_id: "s".to_string(),
    ///     no_results_marker: "No Results Found".to_string(),
    /// };
    /// assert_eq!(
    ///     target.page_url(3).as_str(),
    ///     "https://shop.example.com/pc/home-appliances/?page=3"
    /// );
    /// ```
    pub fn page_url(&self, page: PageNumber) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.page_param, &page.to_string());
        url
    }
}

/// Why a page produced nothing even though the catalog may not be exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    Fetch { reason: String, transient: bool },
    Extraction(String),
}

impl PageFailure {
    /// Whether retrying the same page could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { transient, .. } => *transient,
            Self::Extraction(_) => true,
        }
    }
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { reason, .. } => write!(f, "fetch failed: {}", reason),
            Self::Extraction(reason) => write!(f, "extraction failed: {}", reason),
        }
    }
}

/// Result of processing one page
#[derive(Debug, Default)]
pub struct PageOutcome {
    /// New, complete records in extraction order
    pub records: Vec<Record>,
    /// The listing showed its end-of-catalog marker
    pub no_results_found: bool,
    pub failure: Option<PageFailure>,
    /// Mappings dropped for missing a required field
    pub incomplete: usize,
    /// Mappings dropped because their name was already seen this run
    pub duplicates: usize,
}

impl PageOutcome {
    fn failed(failure: PageFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }
}

/// Fetches, extracts and filters listing pages
pub struct PageProcessor<F, E> {
    fetcher: F,
    extractor: E,
    target: ListingTarget,
    schema: RecordSchema,
}

impl<F: PageFetcher, E: StructuredExtractor> PageProcessor<F, E> {
    pub fn new(fetcher: F, extractor: E, target: ListingTarget, schema: RecordSchema) -> Self {
        Self {
            fetcher,
            extractor,
            target,
            schema,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Processes page `page`
    ///
    /// Signals are classified in priority order:
    /// 1. fetch failure: no records, not terminal, failure attached
    /// 2. no-results marker anywhere in the content: terminal, no records
    /// 3. blank content: no records, extractor not called
    /// 4. otherwise the content is extracted and filtered
    ///
    /// Names of accepted records are added to `seen`.
    pub async fn process_page(&self, page: PageNumber, seen: &mut SeenNames) -> PageOutcome {
        let url = self.target.page_url(page);
        tracing::debug!("Fetching page {}: {}", page, url);

        let content = match self
            .fetcher
            .fetch(&url, &self.target.css_selector, &self.target.session_id)
            .await
        {
            FetchOutcome::Content(content) => content,
            FetchOutcome::Failed { reason, transient } => {
                tracing::warn!("Error fetching page {}: {}", page, reason);
                return PageOutcome::failed(PageFailure::Fetch { reason, transient });
            }
        };

        if content.contains(&self.target.no_results_marker) {
            tracing::info!("No results found on page {}", page);
            return PageOutcome {
                no_results_found: true,
                ..PageOutcome::default()
            };
        }

        if content.trim().is_empty() {
            tracing::info!("Page {} returned no content", page);
            return PageOutcome::default();
        }

        let raw = match self.extractor.extract(&content, &self.schema).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Extraction failed for page {}: {}", page, e);
                return PageOutcome::failed(PageFailure::Extraction(e.to_string()));
            }
        };

        let outcome = accept_records(raw, &self.schema, seen);
        tracing::info!(
            "Extracted {} records from page {} ({} incomplete, {} duplicate)",
            outcome.records.len(),
            page,
            outcome.incomplete,
            outcome.duplicates
        );
        outcome
    }
}

/// Keeps the complete mappings whose name has not been seen, recording the names
pub fn accept_records(
    raw: Vec<RawRecord>,
    schema: &RecordSchema,
    seen: &mut SeenNames,
) -> PageOutcome {
    let mut outcome = PageOutcome::default();

    for mapping in raw {
        let Some(record) = Record::from_raw(mapping, schema) else {
            tracing::debug!("Dropping incomplete record");
            outcome.incomplete += 1;
            continue;
        };

        if !seen.insert(record.name()) {
            tracing::debug!("Duplicate record '{}' found. Skipping.", record.name());
            outcome.duplicates += 1;
            continue;
        }

        outcome.records.push(record);
    }

    outcome
}
