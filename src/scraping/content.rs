//! Content gate applied to fetched pages before tokenizing

use std::fmt;

use super::fetcher::FetchResult;
use crate::config::ContentConfig;

/// Why a fetched page produced no outlinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Status other than 200
    NotOk(u16),
    /// Body empty, too small or too large (bytes)
    EmptyOrSize(usize),
    /// Text is mostly markup or symbols
    LowText,
    /// Near-duplicate of a recently processed page
    Duplicate,
    /// The fetch itself failed
    FetchFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOk(status) => write!(f, "status {}", status),
            Self::EmptyOrSize(len) => write!(f, "bad size ({} bytes)", len),
            Self::LowText => f.write_str("low text ratio"),
            Self::Duplicate => f.write_str("near-duplicate content"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Status, size and text-ratio checks
#[derive(Debug, Clone)]
pub struct ContentGate {
    min_bytes: usize,
    max_bytes: usize,
    min_text_ratio: f64,
}

impl ContentGate {
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            min_bytes: config.min_bytes,
            max_bytes: config.max_bytes,
            min_text_ratio: config.min_text_ratio,
        }
    }

    /// Accept only 200 responses whose body size is within bounds
    pub fn check(&self, result: &FetchResult) -> Result<(), SkipReason> {
        if !result.is_ok() {
            return Err(SkipReason::NotOk(result.status_code));
        }
        let len = result.content.len();
        if len == 0 || len < self.min_bytes || len > self.max_bytes {
            return Err(SkipReason::EmptyOrSize(len));
        }
        Ok(())
    }

    /// True when text is blank or too little of it is alphanumeric or whitespace
    pub fn is_low_text(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }
        let (total, texty) = text.chars().fold((0usize, 0usize), |(total, texty), c| {
            let is_text = c.is_alphanumeric() || c.is_whitespace();
            (total + 1, texty + usize::from(is_text))
        });
        (texty as f64 / total as f64) < self.min_text_ratio
    }
}

impl Default for ContentGate {
    fn default() -> Self {
        Self::new(&ContentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16, len: usize) -> FetchResult {
        FetchResult::new(status, "http://a.ics.uci.edu/", vec![b'a'; len])
    }

    #[test]
    fn test_status_must_be_200() {
        let gate = ContentGate::default();
        assert_eq!(gate.check(&page(404, 500)), Err(SkipReason::NotOk(404)));
        assert_eq!(gate.check(&page(200, 500)), Ok(()));
    }

    #[test]
    fn test_size_bounds() {
        let gate = ContentGate::default();
        assert_eq!(gate.check(&page(200, 0)), Err(SkipReason::EmptyOrSize(0)));
        assert_eq!(gate.check(&page(200, 99)), Err(SkipReason::EmptyOrSize(99)));
        assert_eq!(gate.check(&page(200, 100)), Ok(()));
        assert_eq!(gate.check(&page(200, 5_000_000)), Ok(()));
        assert_eq!(
            gate.check(&page(200, 5_000_001)),
            Err(SkipReason::EmptyOrSize(5_000_001))
        );
    }

    #[test]
    fn test_low_text() {
        let gate = ContentGate::default();
        assert!(gate.is_low_text(""));
        assert!(gate.is_low_text("   \n"));
        assert!(gate.is_low_text("{}[]<>;;;;::::a"));
        assert!(!gate.is_low_text("A perfectly ordinary sentence, with punctuation."));
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NotOk(503).to_string(), "status 503");
        assert_eq!(SkipReason::Duplicate.to_string(), "near-duplicate content");
    }
}
