//! Per-page processing: gate, dedupe, tokenize, extract outlinks

use tracing::{debug, trace};
use url::Url;

use super::types::PageOutcome;
use crate::scraping::{
    analytics::CrawlStats,
    content::{ContentGate, SkipReason},
    dedup::DuplicateChecker,
    extractor::{extract_links, extract_text},
    fetcher::{FetchError, FetchResult},
    tokenizer::tokenize,
    url_filter::UrlFilter,
};

/// Shared, read-mostly pieces a worker needs to process a page
pub(super) struct Pipeline<'a> {
    pub gate: &'a ContentGate,
    pub dedup: &'a DuplicateChecker,
    pub filter: &'a UrlFilter,
    pub stats: &'a CrawlStats,
}

impl Pipeline<'_> {
    /// Turn one fetch attempt into an outcome, updating analytics on the way
    pub fn process(&self, url: &str, fetched: Result<FetchResult, FetchError>) -> PageOutcome {
        self.stats.record_processed();

        let outcome = match fetched {
            Ok(result) => self.process_page(url, &result),
            Err(FetchError::ContentTooLarge(len)) => PageOutcome::Skipped(SkipReason::EmptyOrSize(len)),
            Err(e) => PageOutcome::Skipped(SkipReason::FetchFailed(e.to_string())),
        };

        if let PageOutcome::Skipped(reason) = &outcome {
            debug!("Skipping {}: {}", url, reason);
            self.stats.record_skip(reason);
        }
        outcome
    }

    fn process_page(&self, url: &str, result: &FetchResult) -> PageOutcome {
        if let Err(reason) = self.gate.check(result) {
            return PageOutcome::Skipped(reason);
        }

        let html = String::from_utf8_lossy(&result.content);
        let text = extract_text(&html);
        if self.gate.is_low_text(&text) {
            return PageOutcome::Skipped(SkipReason::LowText);
        }

        if self.dedup.is_duplicate(&text) {
            return PageOutcome::Skipped(SkipReason::Duplicate);
        }

        let tokens = tokenize(&text);
        self.stats.record_page(url, &tokens);

        // Relative links resolve against where the redirect chain ended
        let base = match Url::parse(&result.final_url).or_else(|_| Url::parse(url)) {
            Ok(base) => base,
            Err(_) => {
                return PageOutcome::Processed {
                    outlinks: 0,
                    accepted: Vec::new(),
                }
            }
        };

        let links = extract_links(&html, &base);
        let outlinks = links.len();
        let accepted: Vec<String> = links
            .into_iter()
            .filter(|link| self.filter.is_valid(link))
            .collect();

        let rejected = outlinks - accepted.len();
        if rejected > 0 {
            self.stats.record_rejected_links(rejected);
        }
        trace!("{}: {} outlinks, {} accepted", url, outlinks, accepted.len());

        PageOutcome::Processed { outlinks, accepted }
    }
}
