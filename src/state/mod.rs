//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the crawl loop's running/stopped states
//! - `ResumeStore`: durable "last completed page" slot shared across runs
//! - `SeenNames`: run-scoped set of record names used for deduplication

mod crawl_state;
mod resume;
mod seen_names;

// Re-export main types
pub use crawl_state::CrawlState;
pub use resume::{PageNumber, ResumeStore};
pub use seen_names::SeenNames;
