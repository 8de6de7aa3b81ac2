/// Crawl loop state definitions
///
/// This module defines the states the crawl loop moves through during a run.
use std::fmt;

/// Represents the current state of the crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    // ===== Active States =====
    /// Pages are still being fetched
    Running,

    // ===== Terminal States =====
    /// The listing reported "No Results Found": the catalog is exhausted
    StoppedNoResults,

    /// A page yielded no usable records (or could not be fetched)
    StoppedEmptyPage,

    /// The configured per-run page limit was reached
    StoppedPageLimit,
}

impl CrawlState {
    /// Returns true if this is a terminal state (the loop must exit)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if the loop should keep requesting pages
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Checks whether the loop may move from this state to `to`
    ///
    /// Only `Running` can transition, and it may transition to anything.
    /// Terminal states are final for the lifetime of a run.
    pub fn can_transition_to(&self, to: CrawlState) -> bool {
        match self {
            Self::Running => true,
            Self::StoppedNoResults | Self::StoppedEmptyPage | Self::StoppedPageLimit => *self == to,
        }
    }

    /// Short machine-readable label, used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::StoppedNoResults => "stopped_no_results",
            Self::StoppedEmptyPage => "stopped_empty_page",
            Self::StoppedPageLimit => "stopped_page_limit",
        }
    }

    /// Human-readable explanation of why the run ended
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Running => "crawl in progress",
            Self::StoppedNoResults => "catalog exhausted (no results marker)",
            Self::StoppedEmptyPage => "page yielded no records",
            Self::StoppedPageLimit => "page limit reached",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
