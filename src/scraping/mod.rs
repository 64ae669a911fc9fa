//! Crawl pipeline
//!
//! Workers pull URLs from the `Frontier`, fetch them through a
//! `PageFetcher`, gate and dedupe the content, and feed admissible
//! outlinks back into the frontier.
//!
//! Key components:
//! - `Frontier`: per-host FIFO queues with a politeness delay, durable seen-set
//! - `UrlFilter`: domain/extension checks plus an ordered catalogue of trap rules
//! - `DuplicateChecker`: cosine similarity over a recent window of pages
//! - `ContentGate`: status and size checks before a page is tokenized
//! - `Crawler`: the worker pool tying everything together

pub mod analytics;
pub mod content;
pub mod coordinator;
pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod tokenizer;
pub mod trap_detection;
pub mod url_filter;

pub use analytics::CrawlStats;
pub use content::{ContentGate, SkipReason};
pub use coordinator::{CrawlError, Crawler, PageOutcome};
pub use dedup::DuplicateChecker;
pub use fetcher::{FetchError, FetchResult, HttpFetcher, PageFetcher};
pub use frontier::{Frontier, FrontierError};
pub use tokenizer::tokenize;
pub use url_filter::UrlFilter;

use sha2::{Digest, Sha256};
use url::{Position, Url};

/// Normalize a URL before it is hashed or queued
///
/// - Trims surrounding whitespace
/// - Strips the fragment
/// - Strips trailing slashes
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_fragment.trim_end_matches('/').to_string()
}

/// Stable record key for a URL: SHA-256 over authority, path and query.
///
/// The scheme and fragment do not participate, so `http://` and `https://`
/// spellings of a page share one record.
pub fn url_hash(url: &str) -> String {
    let material = match Url::parse(url) {
        Ok(parsed) => format!(
            "{}/{}/{}",
            &parsed[Position::BeforeUsername..Position::AfterPort],
            parsed.path(),
            parsed.query().unwrap_or("")
        ),
        Err(_) => {
            let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
            rest.split('#').next().unwrap_or(rest).to_string()
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Politeness partition key: scheme, host and explicit port.
///
/// Userinfo is not part of the key, so `http://u@host/` shares a queue with
/// `http://host/`. Unparseable input is keyed by everything up to the first
/// path slash so it still lands in some queue.
pub fn host_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            match parsed.port() {
                Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
                None => format!("{}://{}", parsed.scheme(), host),
            }
        }
        _ => {
            let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
            let authority = rest.split('/').next().unwrap_or(rest);
            format!("{}://{}", scheme, authority).to_lowercase()
        }
    }
}
