//! Configuration for campuscrawl

mod crawler;
mod filter;
mod logging;

pub use crawler::{ContentConfig, CrawlerConfig, DedupConfig};
pub use filter::{FilterConfig, DEFAULT_BINARY_EXTENSIONS};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for page fetches
pub const DEFAULT_USER_AGENT: &str = "campuscrawl/0.1 (academic crawler)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scheduling and persistence
    #[serde(default)]
    pub crawler: CrawlerConfig,
    /// URL admissibility
    #[serde(default)]
    pub filter: FilterConfig,
    /// Near-duplicate detection
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Page content gate
    #[serde(default)]
    pub content: ContentConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config = Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects every problem and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.crawler.threads == 0 {
            errors.push("crawler.threads must be positive".to_string());
        }
        if self.crawler.idle_poll_ms == 0 {
            errors.push("crawler.idle_poll_ms must be positive".to_string());
        }
        if self.crawler.analytics_save_interval == 0 {
            errors.push("crawler.analytics_save_interval must be positive".to_string());
        }

        if self.filter.allowed_domains.is_empty() {
            errors.push("filter.allowed_domains must not be empty".to_string());
        }
        for pattern in &self.filter.allowed_domains {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(format!("filter.allowed_domains entry '{}' is invalid: {}", pattern, e));
            }
        }

        if self.dedup.window_size == 0 {
            errors.push("dedup.window_size must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            errors.push("dedup.similarity_threshold must be between 0.0 and 1.0".to_string());
        }

        if self.content.min_bytes > self.content.max_bytes {
            errors.push("content.min_bytes must not exceed content.max_bytes".to_string());
        }
        if !(0.0..=1.0).contains(&self.content.min_text_ratio) {
            errors.push("content.min_text_ratio must be between 0.0 and 1.0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }
}
