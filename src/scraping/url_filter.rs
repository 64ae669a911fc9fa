//! URL admissibility filter
//!
//! Decides whether a discovered link is worth queuing: scheme, allowed
//! campus domains, binary extensions, then the trap catalogue from
//! [`trap_detection`](super::trap_detection). Anything that fails to parse
//! is rejected.

use regex::Regex;
use thiserror::Error;
use tracing::trace;
use url::Url;

use super::trap_detection::{default_rules, dotted, TrapRule, UrlParts};
use crate::config::FilterConfig;

/// Errors building a filter from configuration
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid allowed-domain pattern '{pattern}': {source}")]
    InvalidDomainPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Filter for discovered URLs
pub struct UrlFilter {
    allowed_domains: Vec<Regex>,
    binary_extensions: Vec<String>,
    rules: Vec<Box<dyn TrapRule>>,
}

impl UrlFilter {
    /// Build a filter with the default trap catalogue
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        Self::with_rules(config, default_rules(config))
    }

    /// Build a filter with a caller-supplied trap catalogue
    pub fn with_rules(
        config: &FilterConfig,
        rules: Vec<Box<dyn TrapRule>>,
    ) -> Result<Self, FilterError> {
        let allowed_domains = config
            .allowed_domains
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| FilterError::InvalidDomainPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let binary_extensions = config.binary_extensions.iter().map(|e| dotted(e)).collect();

        Ok(Self {
            allowed_domains,
            binary_extensions,
            rules,
        })
    }

    /// Append a rule to the end of the catalogue
    pub fn push_rule(&mut self, rule: Box<dyn TrapRule>) {
        self.rules.push(rule);
    }

    /// Number of trap rules evaluated after the structural checks
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// True if the URL should be crawled
    pub fn is_valid(&self, url: &str) -> bool {
        let parsed = match Url::parse(url.trim()) {
            Ok(u) => u,
            Err(_) => return false,
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return false;
        }

        let parts = UrlParts::from_url(&parsed);

        if !self.allowed_domains.iter().any(|p| p.is_match(&parts.authority)) {
            return false;
        }

        if self.binary_extensions.iter().any(|ext| parts.path.ends_with(ext.as_str())) {
            return false;
        }

        if let Some(rule) = self.rules.iter().find(|r| r.matches(&parts)) {
            trace!("Rejected {} as {} trap", url, rule.name());
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::trap_detection::PathPattern;

    fn filter() -> UrlFilter {
        UrlFilter::new(&FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_accepts_campus_page() {
        let f = filter();
        assert!(f.is_valid("http://x.ics.uci.edu/~prof/paper.html"));
        assert!(f.is_valid("https://www.informatics.uci.edu/research"));
        assert!(f.is_valid("https://cs.uci.edu"));
        assert!(f.is_valid("https://www.stat.uci.edu/"));
    }

    #[test]
    fn test_rejects_calendar() {
        assert!(!filter().is_valid("http://x.ics.uci.edu/events/2024/03/"));
    }

    #[test]
    fn test_rejects_scheme_and_garbage() {
        let f = filter();
        assert!(!f.is_valid("ftp://x.ics.uci.edu/file"));
        assert!(!f.is_valid("mailto:someone@ics.uci.edu"));
        assert!(!f.is_valid("not a url"));
        assert!(!f.is_valid(""));
        assert!(!f.is_valid("http://"));
    }

    #[test]
    fn test_rejects_foreign_domains() {
        let f = filter();
        assert!(!f.is_valid("https://www.uci.edu/"));
        assert!(!f.is_valid("https://evilics.uci.edu/"));
        assert!(!f.is_valid("https://ics.uci.edu.example.com/"));
        assert!(!f.is_valid("https://example.com/ics.uci.edu"));
    }

    #[test]
    fn test_port_is_part_of_authority() {
        assert!(!filter().is_valid("http://x.ics.uci.edu:8080/page"));
    }

    #[test]
    fn test_rejects_binary_extensions() {
        let f = filter();
        assert!(!f.is_valid("http://x.ics.uci.edu/paper.PDF"));
        assert!(!f.is_valid("http://x.ics.uci.edu/archive.tar.gz"));
        assert!(!f.is_valid("http://x.ics.uci.edu/photo.jpeg"));
        assert!(f.is_valid("http://x.ics.uci.edu/paper.html"));
    }

    #[test]
    fn test_custom_rule_extends_catalogue() {
        let mut f = filter();
        let before = f.rule_count();
        f.push_rule(Box::new(PathPattern::new(
            "archive",
            Regex::new(r"^/archive/").unwrap(),
        )));
        assert_eq!(f.rule_count(), before + 1);
        assert!(!f.is_valid("http://x.ics.uci.edu/archive/old"));
        assert!(f.is_valid("http://x.ics.uci.edu/current/new"));
    }

    #[test]
    fn test_invalid_domain_pattern() {
        let config = FilterConfig {
            allowed_domains: vec!["(".to_string()],
            ..FilterConfig::default()
        };
        assert!(matches!(
            UrlFilter::new(&config),
            Err(FilterError::InvalidDomainPattern { .. })
        ));
    }
}
