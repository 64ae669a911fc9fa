//! Crawler, content and deduplication configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::DEFAULT_USER_AGENT;

/// Scheduling and persistence settings for a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// URLs the crawl starts from when there is nothing to resume
    pub seed_urls: Vec<String>,
    /// Minimum delay between two dispatches to the same host (milliseconds)
    pub politeness_delay_ms: u64,
    /// Number of worker threads
    pub threads: usize,
    /// Durable URL record store
    pub save_file: PathBuf,
    /// Analytics snapshot written during and after the crawl
    pub analytics_file: PathBuf,
    /// Save analytics every N processed pages
    pub analytics_save_interval: u64,
    /// User agent string
    pub user_agent: String,
    /// Request timeout (seconds)
    pub request_timeout_secs: u64,
    /// How long an idle worker waits before re-checking for work (milliseconds)
    pub idle_poll_ms: u64,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_urls: vec![
                "https://www.ics.uci.edu".to_string(),
                "https://www.cs.uci.edu".to_string(),
                "https://www.informatics.uci.edu".to_string(),
                "https://www.stat.uci.edu".to_string(),
            ],
            politeness_delay_ms: 500,
            threads: 4,
            save_file: PathBuf::from("frontier.sled"),
            analytics_file: PathBuf::from("analytics.json"),
            analytics_save_interval: 50,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            idle_poll_ms: 1000,
        }
    }
}

/// Near-duplicate detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Number of recent page vectors compared against
    pub window_size: usize,
    /// Cosine similarity at or above which a page is a duplicate
    pub similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            similarity_threshold: 0.9,
        }
    }
}

/// Page content gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Pages smaller than this are skipped (bytes)
    pub min_bytes: usize,
    /// Pages larger than this are skipped (bytes)
    pub max_bytes: usize,
    /// Minimum share of alphanumeric-or-whitespace characters in page text
    pub min_text_ratio: f64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_bytes: 100,
            max_bytes: 5_000_000,
            min_text_ratio: 0.5,
        }
    }
}
