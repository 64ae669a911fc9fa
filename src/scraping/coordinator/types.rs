//! Coordinator types: page outcomes, run summaries and errors

use std::time::Duration;
use thiserror::Error;

use crate::scraping::analytics::StatsSnapshot;
use crate::scraping::content::SkipReason;
use crate::scraping::frontier::FrontierError;

/// Errors that end a crawl run early
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Frontier(#[from] FrontierError),
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Outcome of processing a single fetched URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page was accepted. `outlinks` counts every link found on it,
    /// `accepted` holds the ones that passed the URL filter.
    Processed {
        outlinks: usize,
        accepted: Vec<String>,
    },
    /// Page produced no outlinks
    Skipped(SkipReason),
}

impl PageOutcome {
    /// Links to feed back into the frontier
    pub fn accepted_links(&self) -> &[String] {
        match self {
            Self::Processed { accepted, .. } => accepted,
            Self::Skipped(_) => &[],
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

/// What a finished crawl run did
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// URLs dispatched to workers during this run
    pub urls_dispatched: u64,
    /// URLs newly added to the frontier during this run
    pub urls_discovered: u64,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Analytics at the end of the run, including previous runs on resume
    pub stats: StatsSnapshot,
}
