//! Crawl analytics
//!
//! Counters and page statistics shared by every worker. One lock guards the
//! whole snapshot; a second lock serializes periodic saves so two workers
//! crossing the save interval together write once.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

use super::content::SkipReason;
use super::normalize_url;

/// Common English words left out of the word frequency table
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "s", "same",
    "she", "should", "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Longest page seen so far, by token count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongestPage {
    pub url: Option<String>,
    pub word_count: usize,
}

/// Serializable analytics state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub pages_processed: u64,
    pub skipped_not_200: u64,
    pub skipped_empty_or_size: u64,
    pub skipped_low_text: u64,
    pub skipped_duplicate: u64,
    pub skipped_fetch_error: u64,
    /// Outlinks rejected by the URL filter
    pub skipped_url_filter: u64,
    pub unique_urls: BTreeSet<String>,
    pub longest_page: LongestPage,
    pub word_frequencies: HashMap<String, u64>,
    /// Host -> pages accepted on that host
    pub subdomains: BTreeMap<String, BTreeSet<String>>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Read a snapshot; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analytics file {}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse analytics file {}", path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize analytics")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write analytics file {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move analytics file into {}", path.display()))?;
        Ok(())
    }

    /// Most frequent words, highest count first, ties alphabetical
    pub fn top_words(&self, n: usize) -> Vec<(String, u64)> {
        let mut words: Vec<(String, u64)> = self
            .word_frequencies
            .iter()
            .map(|(w, c)| (w.clone(), *c))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(n);
        words
    }

    /// Page counts for hosts ending in `suffix`, alphabetical
    pub fn subdomain_counts(&self, suffix: &str) -> Vec<(String, usize)> {
        self.subdomains
            .iter()
            .filter(|(host, _)| host.ends_with(suffix))
            .map(|(host, pages)| (host.clone(), pages.len()))
            .collect()
    }

    /// Pages skipped for page-level reasons (not counting filtered outlinks)
    pub fn total_page_skips(&self) -> u64 {
        self.skipped_not_200
            + self.skipped_empty_or_size
            + self.skipped_low_text
            + self.skipped_duplicate
            + self.skipped_fetch_error
    }
}

/// Thread-safe analytics shared by the crawl workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    inner: Mutex<StatsSnapshot>,
    last_saved_at: Mutex<u64>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from a saved snapshot
    pub fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        let last_saved_at = snapshot.pages_processed;
        Self {
            inner: Mutex::new(snapshot),
            last_saved_at: Mutex::new(last_saved_at),
        }
    }

    /// Count one dispatched URL that reached processing
    pub fn record_processed(&self) {
        self.inner.lock().pages_processed += 1;
    }

    /// Record an accepted page and its tokens
    pub fn record_page(&self, url: &str, tokens: &[String]) {
        let url = normalize_url(url);
        let host = Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase));

        let mut stats = self.inner.lock();
        stats.unique_urls.insert(url.clone());

        if tokens.len() > stats.longest_page.word_count {
            stats.longest_page = LongestPage {
                url: Some(url.clone()),
                word_count: tokens.len(),
            };
        }

        for token in tokens {
            if STOP_WORDS.contains(&token.as_str()) {
                continue;
            }
            *stats.word_frequencies.entry(token.clone()).or_insert(0) += 1;
        }

        if let Some(host) = host {
            stats.subdomains.entry(host).or_default().insert(url);
        }
    }

    pub fn record_skip(&self, reason: &SkipReason) {
        let mut stats = self.inner.lock();
        match reason {
            SkipReason::NotOk(_) => stats.skipped_not_200 += 1,
            SkipReason::EmptyOrSize(_) => stats.skipped_empty_or_size += 1,
            SkipReason::LowText => stats.skipped_low_text += 1,
            SkipReason::Duplicate => stats.skipped_duplicate += 1,
            SkipReason::FetchFailed(_) => stats.skipped_fetch_error += 1,
        }
    }

    pub fn record_rejected_links(&self, count: usize) {
        self.inner.lock().skipped_url_filter += count as u64;
    }

    pub fn pages_processed(&self) -> u64 {
        self.inner.lock().pages_processed
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }

    /// Write a snapshot now
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut snapshot = self.snapshot();
        snapshot.saved_at = Some(Utc::now());
        snapshot.save(path)?;
        *self.last_saved_at.lock() = snapshot.pages_processed;
        debug!("Saved analytics after {} pages", snapshot.pages_processed);
        Ok(())
    }

    /// Save if at least `interval` pages were processed since the last save.
    /// Failures are logged, never propagated.
    pub fn maybe_save(&self, path: &Path, interval: u64) -> bool {
        let mut last_saved_at = self.last_saved_at.lock();
        let processed = self.pages_processed();
        if processed.saturating_sub(*last_saved_at) < interval {
            return false;
        }
        *last_saved_at = processed;
        drop(last_saved_at);

        if let Err(e) = self.save(path) {
            warn!("Failed to save analytics: {:#}", e);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::tokenize;
    use tempfile::TempDir;

    #[test]
    fn test_record_page() {
        let stats = CrawlStats::new();
        stats.record_page("http://a.ics.uci.edu/x#frag", &tokenize("the rust rust compiler"));
        stats.record_page("http://b.ics.uci.edu/y", &tokenize("rust"));

        let snap = stats.snapshot();
        assert_eq!(snap.unique_urls.len(), 2);
        assert!(snap.unique_urls.contains("http://a.ics.uci.edu/x"));
        assert_eq!(snap.longest_page.url.as_deref(), Some("http://a.ics.uci.edu/x"));
        assert_eq!(snap.longest_page.word_count, 4);
        assert_eq!(snap.word_frequencies["rust"], 3);
        assert!(!snap.word_frequencies.contains_key("the"));
        assert_eq!(
            snap.subdomain_counts(".uci.edu"),
            vec![("a.ics.uci.edu".to_string(), 1), ("b.ics.uci.edu".to_string(), 1)]
        );
    }

    #[test]
    fn test_skip_counters() {
        let stats = CrawlStats::new();
        stats.record_skip(&SkipReason::NotOk(404));
        stats.record_skip(&SkipReason::Duplicate);
        stats.record_skip(&SkipReason::Duplicate);
        stats.record_rejected_links(5);

        let snap = stats.snapshot();
        assert_eq!(snap.skipped_not_200, 1);
        assert_eq!(snap.skipped_duplicate, 2);
        assert_eq!(snap.skipped_url_filter, 5);
        assert_eq!(snap.total_page_skips(), 3);
    }

    #[test]
    fn test_top_words_order() {
        let stats = CrawlStats::new();
        stats.record_page("http://a.ics.uci.edu/", &tokenize("beta alpha beta gamma gamma"));
        let top = stats.snapshot().top_words(2);
        assert_eq!(top, vec![("beta".to_string(), 2), ("gamma".to_string(), 2)]);
    }

    #[test]
    fn test_save_and_restore() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("analytics.json");

        let stats = CrawlStats::new();
        stats.record_processed();
        stats.record_page("http://a.ics.uci.edu/x", &tokenize("hello world"));
        stats.save(&path).unwrap();

        let loaded = StatsSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.pages_processed, 1);
        assert!(loaded.saved_at.is_some());

        let restored = CrawlStats::from_snapshot(loaded);
        assert_eq!(restored.pages_processed(), 1);
        assert!(!restored.maybe_save(&path, 1));
        restored.record_processed();
        assert!(restored.maybe_save(&path, 1));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(StatsSnapshot::load(&temp_dir.path().join("none.json")).unwrap().is_none());
    }
}
