//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, which:
//! - Picks the first page from the resume state
//! - Drives the page processor one page at a time
//! - Retries pages that failed transiently
//! - Persists progress after every completed page
//! - Flushes accepted records to the sink
//! - Reports extractor usage once the loop stops

use crate::config::{Config, FlushMode};
use crate::crawler::extractor::{LlmExtractor, StructuredExtractor};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::processor::{ListingTarget, PageOutcome, PageProcessor};
use crate::output::{print_report, CrawlStatistics, CsvSink, ResultSink};
use crate::record::Record;
use crate::state::{CrawlState, PageNumber, ResumeStore, SeenNames};
use crate::Result;
use std::time::{Duration, Instant};
use url::Url;

/// Loop pacing and flushing knobs
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub page_delay: Duration,
    pub max_fetch_retries: u32,
    pub retry_delay: Duration,
    pub max_pages: Option<u32>,
    pub flush: FlushMode,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_delay: Duration::from_millis(config.crawler.page_delay),
            max_fetch_retries: config.crawler.max_fetch_retries,
            retry_delay: Duration::from_millis(config.crawler.retry_delay),
            max_pages: config.crawler.max_pages,
            flush: config.output.flush,
        }
    }
}

/// What a finished run did
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// First page requested this run
    pub first_page: PageNumber,

    /// Last page whose records were accepted, if any
    pub last_completed_page: Option<PageNumber>,

    /// Rows handed to the sink
    pub records_saved: usize,

    pub destination: String,

    pub stats: CrawlStatistics,
}

impl CrawlReport {
    pub fn final_state(&self) -> CrawlState {
        self.stats.final_state
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<F, E, S> {
    processor: PageProcessor<F, E>,
    resume: ResumeStore,
    sink: S,
    settings: CrawlSettings,
}

impl Coordinator<HttpFetcher, LlmExtractor, CsvSink> {
    /// Wires the HTTP fetcher, LLM extractor and CSV sink from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Bad base URL, missing API key, or HTTP client failure
    pub fn from_config(config: &Config) -> Result<Self> {
        let schema = config.schema.record_schema();

        let target = ListingTarget {
            base_url: Url::parse(&config.crawler.base_url)?,
            page_param: config.crawler.page_param.clone(),
            css_selector: config.crawler.css_selector.clone(),
            session_id: config.crawler.session_id.clone(),
            no_results_marker: config.crawler.no_results_marker.clone(),
        };

        let fetcher = HttpFetcher::new(config.fetcher.clone());
        let extractor = LlmExtractor::from_config(&config.extractor)?;
        let sink = CsvSink::new(&config.output.csv_path, schema.clone());

        Ok(Self::new(
            PageProcessor::new(fetcher, extractor, target, schema),
            ResumeStore::new(&config.output.resume_path),
            sink,
            CrawlSettings::from_config(config),
        ))
    }
}

impl<F, E, S> Coordinator<F, E, S>
where
    F: PageFetcher,
    E: StructuredExtractor,
    S: ResultSink,
{
    pub fn new(
        processor: PageProcessor<F, E>,
        resume: ResumeStore,
        sink: S,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            processor,
            resume,
            sink,
            settings,
        }
    }

    pub fn processor(&self) -> &PageProcessor<F, E> {
        &self.processor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs the crawl loop to a terminal state
    ///
    /// With `fresh` set, stored progress is discarded and the crawl starts at
    /// page 1. Every call starts a new run: the state machine begins at
    /// `Running` and the seen-name set starts empty.
    ///
    /// The run summary is printed on success, then extractor usage is
    /// reported exactly once, whether the run ends normally or with an error.
    pub async fn run(&mut self, fresh: bool) -> Result<CrawlReport> {
        let result = self.crawl(fresh).await;
        if let Ok(report) = &result {
            print_report(report);
        }
        self.processor.extractor().report_usage();
        result
    }

    async fn crawl(&mut self, fresh: bool) -> Result<CrawlReport> {
        let start_time = Instant::now();

        let mut state = CrawlState::Running;
        let mut seen = SeenNames::new();

        let next_page = if fresh {
            tracing::info!("Starting fresh crawl (ignoring previous state)");
            self.resume.clear()?;
            Some(1)
        } else {
            let next_page = self.resume.next_page();
            match next_page {
                Some(page) if page > 1 => {
                    tracing::info!("Resuming crawl after completed page {}", page - 1)
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        "Stored progress is already at the last page. Nothing to crawl."
                    );
                    transition(&mut state, CrawlState::StoppedPageLimit);
                }
            }
            next_page
        };

        let first_page = next_page.unwrap_or(PageNumber::MAX);
        let mut stats = CrawlStatistics::default();
        let mut accumulated: Vec<Record> = Vec::new();
        let mut last_completed_page = None;
        let mut page = first_page;
        let mut retries_used = 0;

        while state.is_active() {
            tracing::info!("Processing page {}", page);
            let outcome = self.processor.process_page(page, &mut seen).await;
            stats.incomplete_dropped += outcome.incomplete;
            stats.duplicates_dropped += outcome.duplicates;

            if let Some(failure) = &outcome.failure {
                if failure.is_transient() && retries_used < self.settings.max_fetch_retries {
                    retries_used += 1;
                    stats.fetch_retries += 1;
                    tracing::warn!(
                        "Page {} {}; retry {}/{}",
                        page,
                        failure,
                        retries_used,
                        self.settings.max_fetch_retries
                    );
                    pause(self.settings.retry_delay).await;
                    continue;
                }
            }
            retries_used = 0;

            match classify(&outcome) {
                CrawlState::StoppedNoResults => {
                    tracing::info!("No more records found. Ending crawl.");
                    transition(&mut state, CrawlState::StoppedNoResults);
                }
                CrawlState::StoppedEmptyPage => {
                    match &outcome.failure {
                        Some(failure) => {
                            tracing::warn!("No records extracted from page {} ({}).", page, failure)
                        }
                        None => tracing::info!("No records extracted from page {}.", page),
                    }
                    transition(&mut state, CrawlState::StoppedEmptyPage);
                }
                _ => {
                    let count = outcome.records.len();
                    match self.settings.flush {
                        FlushMode::EndOfRun => accumulated.extend(outcome.records),
                        FlushMode::PerPage => {
                            self.sink.append(&outcome.records)?;
                        }
                    }
                    self.resume.write(page)?;

                    stats.records_accepted += count;
                    stats.pages_completed += 1;
                    last_completed_page = Some(page);
                    tracing::info!(
                        "Page {} complete: {} new records ({} this run)",
                        page,
                        count,
                        stats.records_accepted
                    );

                    if self
                        .settings
                        .max_pages
                        .is_some_and(|max| stats.pages_completed >= max)
                    {
                        tracing::info!("Reached page limit of {} pages.", stats.pages_completed);
                        transition(&mut state, CrawlState::StoppedPageLimit);
                        continue;
                    }

                    match page.checked_add(1) {
                        Some(next) => {
                            page = next;
                            pause(self.settings.page_delay).await;
                        }
                        None => {
                            tracing::warn!(
                                "Page {} is the last addressable page. Ending crawl.",
                                page
                            );
                            transition(&mut state, CrawlState::StoppedPageLimit);
                        }
                    }
                }
            }
        }

        let records_saved = match self.settings.flush {
            FlushMode::EndOfRun if accumulated.is_empty() => 0,
            FlushMode::EndOfRun => self.sink.append(&accumulated)?,
            FlushMode::PerPage => stats.records_accepted,
        };

        stats.final_state = state;
        stats.elapsed = start_time.elapsed();
        tracing::info!(
            "Crawl finished ({}): {} pages in {:?}",
            state,
            stats.pages_completed,
            stats.elapsed
        );

        Ok(CrawlReport {
            first_page,
            last_completed_page,
            records_saved,
            destination: self.sink.destination(),
            stats,
        })
    }
}

fn transition(state: &mut CrawlState, to: CrawlState) {
    debug_assert!(state.can_transition_to(to));
    tracing::debug!("Crawl state {} -> {}", state, to);
    *state = to;
}

/// Maps a page outcome to the state the loop moves to
fn classify(outcome: &PageOutcome) -> CrawlState {
    if outcome.no_results_found {
        CrawlState::StoppedNoResults
    } else if outcome.records.is_empty() {
        CrawlState::StoppedEmptyPage
    } else {
        CrawlState::Running
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
