//! Crawl trap detection
//!
//! A trap is a URL that is reachable and well formed but leads into
//! unbounded or worthless crawling: calendar widgets, wiki revision links,
//! GitLab blob/commit views, deep pagination, search result pages.
//!
//! Each trap family is a [`TrapRule`]. The filter walks an ordered list of
//! rules and rejects on the first match, so new traps are added by pushing
//! another rule (usually one of the table-driven kinds below) rather than
//! editing control flow.

use regex::Regex;
use std::collections::HashSet;
use url::{Position, Url};

use crate::config::FilterConfig;

/// Query parameters that mark a search page when they are the whole key
pub const EXACT_SEARCH_PARAMS: &[&str] = &["q", "s"];

/// Query parameters that mark a search/filter page when contained in a key
pub const CONTAINS_SEARCH_PARAMS: &[&str] = &["search", "query", "filter", "share"];

/// Query fragments that carry pagination or archive browsing state
pub const PAGINATION_QUERY_PARAMS: &[&str] = &["p=", "cat=", "author=", "page_id="];

/// Query words that indicate a date-driven page
pub const DATE_QUERY_MARKERS: &[&str] = &["date", "year", "month", "day", "time", "timestamp", "ical"];

/// Query actions that ask for a download instead of a page
pub const EXPORT_QUERY_ACTIONS: &[&str] = &["do=media", "action=download", "action=export"];

/// DokuWiki query keys that produce index/admin views
pub const DOKUWIKI_QUERY_MARKERS: &[&str] = &["do=", "idx=", "sectok="];

/// Query fragments for wiki revisions, diffs and raw exports
pub const WIKI_QUERY_MARKERS: &[&str] = &["version=", "action=diff", "format=txt"];

/// GitLab UI paths that enumerate repository history
pub const VCS_PATH_MARKERS: &[&str] = &[
    "/-/commit",
    "/-/blob",
    "/-/tree",
    "/-/raw",
    "/-/blame",
    "/-/compare",
    "/-/merge_requests",
    "/-/jobs",
    "/-/pipelines",
    "/-/network",
    "/-/tags",
    "/-/commits",
    "/-/branches",
    "/-/issues",
    "/-/milestones",
    "/-/releases",
    "/-/forks",
];

/// Path segments of video listings
pub const VIDEO_SEGMENTS: &[&str] = &["videos", "video"];

/// Lowercased view of a parsed URL shared by every rule
#[derive(Debug, Clone)]
pub struct UrlParts {
    /// host[:port]
    pub authority: String,
    pub path: String,
    /// Lowercased raw query; `None` when absent or empty
    pub query: Option<String>,
    /// Query exactly as it appears in the URL
    pub raw_query: Option<String>,
    /// Non-empty path segments
    pub segments: Vec<String>,
}

impl UrlParts {
    pub fn from_url(url: &Url) -> Self {
        let authority = url[Position::BeforeHost..Position::AfterPort].to_lowercase();
        let path = url.path().to_lowercase();
        let raw_query = url.query().filter(|q| !q.is_empty()).map(str::to_string);
        let query = raw_query.as_ref().map(|q| q.to_lowercase());
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            authority,
            path,
            query,
            raw_query,
            segments,
        }
    }

    fn query_contains_any<S: AsRef<str>>(&self, needles: &[S]) -> bool {
        match &self.query {
            Some(q) => needles.iter().any(|n| q.contains(n.as_ref())),
            None => false,
        }
    }
}

/// One family of crawler traps
pub trait TrapRule: Send + Sync {
    /// Short identifier used in debug logs
    fn name(&self) -> &str;

    /// True if the URL falls into this trap
    fn matches(&self, url: &UrlParts) -> bool;
}

/// Compile a built-in pattern
fn builtin(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in trap pattern is valid")
}

/// Rejects when the lowercased path matches a regex
pub struct PathPattern {
    name: String,
    pattern: Regex,
}

impl PathPattern {
    pub fn new(name: impl Into<String>, pattern: Regex) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }
}

impl TrapRule for PathPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &UrlParts) -> bool {
        self.pattern.is_match(&url.path)
    }
}

/// Rejects when the query contains any of the given fragments
pub struct QueryFragments {
    name: String,
    needles: Vec<String>,
}

impl QueryFragments {
    pub fn new(name: impl Into<String>, needles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            needles,
        }
    }
}

impl TrapRule for QueryFragments {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &UrlParts) -> bool {
        url.query_contains_any(&self.needles)
    }
}

/// Rejects when the query contains every one of the given fragments
pub struct QueryAllOf {
    name: String,
    needles: Vec<String>,
}

impl QueryAllOf {
    pub fn new(name: impl Into<String>, needles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            needles,
        }
    }
}

impl TrapRule for QueryAllOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &UrlParts) -> bool {
        match &url.query {
            Some(q) => !self.needles.is_empty() && self.needles.iter().all(|n| q.contains(n.as_str())),
            None => false,
        }
    }
}

/// Rejects when any path segment is in a denylist
pub struct SegmentDenylist {
    name: String,
    segments: HashSet<String>,
}

impl SegmentDenylist {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, segments: &[S]) -> Self {
        Self {
            name: name.into(),
            segments: segments.iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }
}

impl TrapRule for SegmentDenylist {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, url: &UrlParts) -> bool {
        url.segments.iter().any(|s| self.segments.contains(s))
    }
}

/// Calendar and date archive pages
pub struct CalendarTrap {
    iso_date: Regex,
    event_listing: Regex,
    query_markers: Vec<String>,
}

impl CalendarTrap {
    pub fn new() -> Self {
        Self {
            iso_date: builtin(r"\b\d{4}-\d{2}(-\d{2})?\b"),
            event_listing: builtin(r"/events/(month|day|week|list|category)/"),
            query_markers: DATE_QUERY_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// `/2024/03` style year + month segment pairs
    fn has_year_month(segments: &[String]) -> bool {
        segments.windows(2).any(|pair| {
            let (year, month) = (&pair[0], &pair[1]);
            let year_ok = year.len() == 4
                && year.bytes().all(|b| b.is_ascii_digit())
                && year
                    .parse::<u32>()
                    .map(|y| (1900..=2099).contains(&y))
                    .unwrap_or(false);
            let month_ok = !month.is_empty()
                && month.bytes().all(|b| b.is_ascii_digit())
                && month
                    .parse::<u32>()
                    .map(|m| (1..=12).contains(&m))
                    .unwrap_or(false);
            year_ok && month_ok
        })
    }
}

impl Default for CalendarTrap {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapRule for CalendarTrap {
    fn name(&self) -> &str {
        "calendar"
    }

    fn matches(&self, url: &UrlParts) -> bool {
        Self::has_year_month(&url.segments)
            || self.iso_date.is_match(&url.path)
            || self.event_listing.is_match(&url.path)
            || url.path.contains("/timeline")
            || url.query_contains_any(&self.query_markers)
    }
}

/// Wiki engine actions, revisions and raw exports
pub struct WikiTrap {
    engine_path: String,
    engine_markers: Vec<String>,
    revision_markers: Vec<String>,
}

impl WikiTrap {
    pub fn new() -> Self {
        Self {
            engine_path: "doku.php".to_string(),
            engine_markers: DOKUWIKI_QUERY_MARKERS.iter().map(|s| s.to_string()).collect(),
            revision_markers: WIKI_QUERY_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for WikiTrap {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapRule for WikiTrap {
    fn name(&self) -> &str {
        "wiki"
    }

    fn matches(&self, url: &UrlParts) -> bool {
        if url.query.is_none() {
            return false;
        }
        (url.path.contains(&self.engine_path) && url.query_contains_any(&self.engine_markers))
            || url.query_contains_any(&self.revision_markers)
    }
}

/// Repository browser views on hosts that run a VCS UI
pub struct VcsTrap {
    host_markers: Vec<String>,
    path_markers: Vec<String>,
}

impl VcsTrap {
    pub fn new<S: AsRef<str>>(host_markers: &[S]) -> Self {
        Self {
            host_markers: host_markers.iter().map(|s| s.as_ref().to_lowercase()).collect(),
            path_markers: VCS_PATH_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TrapRule for VcsTrap {
    fn name(&self) -> &str {
        "vcs"
    }

    fn matches(&self, url: &UrlParts) -> bool {
        self.host_markers.iter().any(|m| url.authority.contains(m.as_str()))
            && self.path_markers.iter().any(|m| url.path.contains(m.as_str()))
    }
}

/// `/page/N` past a limit, or pagination query parameters
pub struct PaginationTrap {
    max_page: u64,
    page_segment: Regex,
    query_markers: Vec<String>,
}

impl PaginationTrap {
    pub fn new(max_page: u64) -> Self {
        Self {
            max_page,
            page_segment: builtin(r"/page/(\d+)(?:/|$)"),
            query_markers: PAGINATION_QUERY_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TrapRule for PaginationTrap {
    fn name(&self) -> &str {
        "pagination"
    }

    fn matches(&self, url: &UrlParts) -> bool {
        if let Some(caps) = self.page_segment.captures(&url.path) {
            // digits too long for u64 are certainly past the limit
            let page = caps[1].parse::<u64>().unwrap_or(u64::MAX);
            if page > self.max_page {
                return true;
            }
        }
        url.query_contains_any(&self.query_markers)
    }
}

/// Search and filter result pages, judged by query parameter names
pub struct SearchParamTrap {
    exact: HashSet<String>,
    contains: Vec<String>,
}

impl SearchParamTrap {
    pub fn new() -> Self {
        Self {
            exact: EXACT_SEARCH_PARAMS.iter().map(|s| s.to_string()).collect(),
            contains: CONTAINS_SEARCH_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for SearchParamTrap {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapRule for SearchParamTrap {
    fn name(&self) -> &str {
        "search"
    }

    fn matches(&self, url: &UrlParts) -> bool {
        let Some(raw) = &url.raw_query else {
            return false;
        };
        url::form_urlencoded::parse(raw.as_bytes()).any(|(key, _)| {
            let key = key.to_lowercase();
            self.exact.contains(&key) || self.contains.iter().any(|c| key.contains(c.as_str()))
        })
    }
}

/// Build the default ordered trap catalogue
pub fn default_rules(config: &FilterConfig) -> Vec<Box<dyn TrapRule>> {
    let mut export_needles: Vec<String> = EXPORT_QUERY_ACTIONS.iter().map(|s| s.to_string()).collect();
    export_needles.extend(config.binary_extensions.iter().map(|ext| dotted(ext)));

    vec![
        Box::new(PathPattern::new(
            "login",
            builtin(r"(wp-login|login|signin|sign-in)\.php"),
        )),
        Box::new(CalendarTrap::new()),
        Box::new(QueryFragments::new("binary-export", export_needles)),
        Box::new(WikiTrap::new()),
        Box::new(VcsTrap::new(config.vcs_host_markers.as_slice())),
        Box::new(PathPattern::new("display-template", builtin(r"display\.html/.+"))),
        Box::new(SegmentDenylist::new("denied-segment", config.denied_segments.as_slice())),
        Box::new(SegmentDenylist::new("video-listing", VIDEO_SEGMENTS)),
        Box::new(PathPattern::new("slide", builtin(r"/(?:t)?sld\d+\.html?$"))),
        Box::new(PathPattern::new("numbered-report", builtin(r"/r\d+a?\.html$"))),
        Box::new(PaginationTrap::new(config.max_pagination_page)),
        Box::new(SearchParamTrap::new()),
        Box::new(QueryAllOf::new(
            "dir-listing-sort",
            vec!["c=".to_string(), "o=".to_string()],
        )),
    ]
}

/// `pdf` -> `.pdf`, leaving already dotted extensions alone
pub(crate) fn dotted(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(url: &str) -> UrlParts {
        UrlParts::from_url(&Url::parse(url).unwrap())
    }

    fn rules() -> Vec<Box<dyn TrapRule>> {
        default_rules(&FilterConfig::default())
    }

    fn first_match(url: &str) -> Option<String> {
        let p = parts(url);
        rules()
            .iter()
            .find(|r| r.matches(&p))
            .map(|r| r.name().to_string())
    }

    #[test]
    fn test_normal_url_is_not_trap() {
        assert_eq!(first_match("http://www.ics.uci.edu/~prof/paper.html"), None);
        assert_eq!(first_match("https://www.stat.uci.edu/faculty/"), None);
    }

    #[test]
    fn test_login_page() {
        assert_eq!(first_match("https://wics.ics.uci.edu/wp-login.php?redirect_to=x").as_deref(), Some("login"));
    }

    #[test]
    fn test_calendar_year_month() {
        assert_eq!(first_match("http://x.ics.uci.edu/events/2024/03/").as_deref(), Some("calendar"));
        assert_eq!(first_match("http://x.ics.uci.edu/news/2024/13/"), None);
        assert_eq!(first_match("http://x.ics.uci.edu/news/1850/01/"), None);
    }

    #[test]
    fn test_calendar_iso_date_and_listing() {
        assert_eq!(first_match("http://x.ics.uci.edu/event/2023-10-05").as_deref(), Some("calendar"));
        assert_eq!(first_match("http://x.ics.uci.edu/events/month/").as_deref(), Some("calendar"));
        assert_eq!(first_match("http://x.ics.uci.edu/group/timeline").as_deref(), Some("calendar"));
        assert_eq!(first_match("http://x.ics.uci.edu/cal?ical=1").as_deref(), Some("calendar"));
    }

    #[test]
    fn test_binary_export_query() {
        assert_eq!(
            first_match("http://x.ics.uci.edu/wiki?action=download").as_deref(),
            Some("binary-export")
        );
        assert_eq!(
            first_match("http://x.ics.uci.edu/get?file=slides.pdf").as_deref(),
            Some("binary-export")
        );
    }

    #[test]
    fn test_wiki_traps() {
        assert_eq!(first_match("http://wiki.ics.uci.edu/doku.php?id=a&idx=b").as_deref(), Some("wiki"));
        assert_eq!(first_match("http://wiki.ics.uci.edu/page?action=diff&rev=3").as_deref(), Some("wiki"));
        assert_eq!(first_match("http://wiki.ics.uci.edu/doku.php?id=start"), None);
    }

    #[test]
    fn test_vcs_trap_requires_marker_host() {
        assert_eq!(
            first_match("https://gitlab.ics.uci.edu/group/proj/-/commit/abc").as_deref(),
            Some("vcs")
        );
        assert_eq!(first_match("https://www.ics.uci.edu/group/proj/-/commit/abc"), None);
    }

    #[test]
    fn test_path_traps() {
        assert_eq!(
            first_match("http://x.ics.uci.edu/display.html/anything").as_deref(),
            Some("display-template")
        );
        assert_eq!(first_match("http://www.ics.uci.edu/~eppstein/junkyard/x.html").as_deref(), Some("denied-segment"));
        assert_eq!(first_match("http://x.ics.uci.edu/media/videos/").as_deref(), Some("video-listing"));
        assert_eq!(first_match("http://x.ics.uci.edu/talk/sld012.htm").as_deref(), Some("slide"));
        assert_eq!(first_match("http://x.ics.uci.edu/talk/tsld003.html").as_deref(), Some("slide"));
        assert_eq!(first_match("http://x.ics.uci.edu/reports/r12a.html").as_deref(), Some("numbered-report"));
    }

    #[test]
    fn test_pagination() {
        assert_eq!(first_match("http://x.ics.uci.edu/blog/page/5/"), None);
        assert_eq!(first_match("http://x.ics.uci.edu/blog/page/6/").as_deref(), Some("pagination"));
        assert_eq!(first_match("http://x.ics.uci.edu/blog/page/99999999999999999999999").as_deref(), Some("pagination"));
        assert_eq!(first_match("http://x.ics.uci.edu/?page_id=12").as_deref(), Some("pagination"));
    }

    #[test]
    fn test_search_params() {
        assert_eq!(first_match("http://x.ics.uci.edu/find?q=rust").as_deref(), Some("search"));
        assert_eq!(first_match("http://x.ics.uci.edu/list?tribe_filterbar=1").as_deref(), Some("search"));
        assert_eq!(first_match("http://x.ics.uci.edu/list?qq=1"), None);
    }

    #[test]
    fn test_dir_listing_sort() {
        assert_eq!(first_match("http://x.ics.uci.edu/files/?C=M;O=A").as_deref(), Some("dir-listing-sort"));
        assert_eq!(first_match("http://x.ics.uci.edu/files/?C=M"), None);
    }

    #[test]
    fn test_dotted() {
        assert_eq!(dotted("PDF"), ".pdf");
        assert_eq!(dotted(".zip"), ".zip");
    }
}
