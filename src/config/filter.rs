//! URL filter configuration

use serde::{Deserialize, Serialize};

/// Allowed domains, binary extensions and trap thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Anchored regexes matched against the lowercased `host[:port]`
    pub allowed_domains: Vec<String>,
    /// File extensions never fetched (with or without the leading dot)
    pub binary_extensions: Vec<String>,
    /// Highest `/page/N` that is still followed
    pub max_pagination_page: u64,
    /// Host substrings that identify a GitLab-style repository browser
    pub vcs_host_markers: Vec<String>,
    /// Path segments that are never followed
    pub denied_segments: Vec<String>,
}

/// Extensions of content the crawler cannot tokenize
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid", "mp2", "mp3",
    "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf", "ps", "eps",
    "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat", "exe", "bz2",
    "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf", "tgz", "sha1", "thmx",
    "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf", "wma", "zip", "rar", "gz",
];

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec![
                r"^(.+\.)?ics\.uci\.edu$".to_string(),
                r"^(.+\.)?cs\.uci\.edu$".to_string(),
                r"^(.+\.)?informatics\.uci\.edu$".to_string(),
                r"^(.+\.)?stat\.uci\.edu$".to_string(),
            ],
            binary_extensions: DEFAULT_BINARY_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_pagination_page: 5,
            vcs_host_markers: vec!["gitlab".to_string()],
            denied_segments: ["junkyard", "pix", "ca", "untetra"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
