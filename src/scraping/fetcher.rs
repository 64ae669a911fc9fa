//! Page fetching
//!
//! Workers fetch through the [`PageFetcher`] trait so the pipeline can be
//! driven by a real HTTP client or by canned pages in tests.

use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

use crate::config::{ContentConfig, CrawlerConfig};

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
}

/// Raw result of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code
    pub status_code: u16,
    /// URL after redirects
    pub final_url: String,
    /// Response body
    pub content: Vec<u8>,
}

impl FetchResult {
    pub fn new(status_code: u16, final_url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            final_url: final_url.into(),
            content: content.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Anything that can turn a URL into a page
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResult, FetchError>;
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Bodies announced larger than this are not downloaded
    pub max_content_size: usize,
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn from_config(crawler: &CrawlerConfig, content: &ContentConfig) -> Self {
        Self {
            user_agent: crawler.user_agent.clone(),
            timeout: crawler.request_timeout(),
            max_content_size: content.max_bytes,
            ..Self::default()
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_content_size: 5_000_000,
            max_redirects: 10,
        }
    }
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: Client,
    max_content_size: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_content_size: config.max_content_size,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self.client.get(parsed).send()?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        if let Some(len) = response.content_length() {
            let len = len as usize;
            if len > self.max_content_size {
                return Err(FetchError::ContentTooLarge(len));
            }
        }

        let content = response.bytes()?.to_vec();
        trace!("Fetched {} ({} bytes, status {})", final_url, content.len(), status_code);

        Ok(FetchResult {
            status_code,
            final_url,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_from_crawler_config() {
        let crawler = CrawlerConfig {
            user_agent: "test-agent".to_string(),
            request_timeout_secs: 7,
            ..CrawlerConfig::default()
        };
        let content = ContentConfig {
            max_bytes: 1234,
            ..ContentConfig::default()
        };

        let config = FetchConfig::from_config(&crawler, &content);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.max_content_size, 1234);
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn test_invalid_url_rejected_before_request() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        assert!(matches!(
            fetcher.fetch("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_fetch_result_status() {
        assert!(FetchResult::new(200, "http://a.ics.uci.edu", "body").is_ok());
        assert!(!FetchResult::new(404, "http://a.ics.uci.edu", "body").is_ok());
    }
}
