//! campuscrawl: a polite crawler for a fixed set of academic domains
//!
//! Features:
//! - Multi-threaded workers sharing one frontier with per-host politeness
//! - Durable seen-set (sled) so a crawl can be resumed after a crash
//! - URL admissibility filter with an ordered crawl-trap catalogue
//! - Near-duplicate detection via cosine similarity over recent pages
//! - Crawl analytics: word frequencies, longest page, per-subdomain counts

pub mod config;
pub mod scraping;
pub mod storage;

pub use config::Config;
pub use scraping::{
    CrawlStats, Crawler, DuplicateChecker, Frontier, HttpFetcher, PageFetcher, UrlFilter,
};
pub use storage::{MemoryStore, RecordStore, SledStore, UrlRecord};
