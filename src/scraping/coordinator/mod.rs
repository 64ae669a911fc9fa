//! Crawl coordinator
//!
//! Runs a fixed pool of worker threads over a shared [`Frontier`]. Each worker
//! loops: take the next URL, fetch it, run it through the page pipeline, add
//! accepted outlinks, then mark the URL complete. The run ends when the
//! frontier reports that no work remains.

mod pipeline;
mod types;

pub use types::*;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info, warn};

use self::pipeline::Pipeline;
use super::{
    analytics::CrawlStats,
    content::ContentGate,
    dedup::DuplicateChecker,
    fetcher::PageFetcher,
    frontier::{Frontier, FrontierError},
    url_filter::UrlFilter,
};
use crate::config::Config;

/// Worker pool driving a crawl to completion
pub struct Crawler {
    frontier: Arc<Frontier>,
    filter: Arc<UrlFilter>,
    fetcher: Arc<dyn PageFetcher>,
    gate: ContentGate,
    dedup: DuplicateChecker,
    stats: Arc<CrawlStats>,
    threads: usize,
    analytics_file: Option<PathBuf>,
    analytics_save_interval: u64,
    urls_dispatched: AtomicU64,
    urls_discovered: AtomicU64,
}

impl Crawler {
    pub fn new(
        config: &Config,
        frontier: Arc<Frontier>,
        filter: Arc<UrlFilter>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            frontier,
            filter,
            fetcher,
            gate: ContentGate::new(&config.content),
            dedup: DuplicateChecker::new(config.dedup.window_size, config.dedup.similarity_threshold),
            stats: Arc::new(CrawlStats::new()),
            threads: config.crawler.threads.max(1),
            analytics_file: None,
            analytics_save_interval: config.crawler.analytics_save_interval.max(1),
            urls_dispatched: AtomicU64::new(0),
            urls_discovered: AtomicU64::new(0),
        }
    }

    /// Use existing analytics, e.g. restored from a previous run
    pub fn with_stats(mut self, stats: Arc<CrawlStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Save analytics to `path` periodically and when the run ends
    pub fn with_analytics_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.analytics_file = Some(path.into());
        self
    }

    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// Crawl until the frontier is drained or a worker fails.
    ///
    /// A storage error or a panic in one worker shuts the frontier down so
    /// the remaining workers exit; the first failure is returned.
    pub fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let start = Instant::now();
        info!(
            "Starting crawl with {} workers ({} URLs pending, {:?} politeness delay)",
            self.threads,
            self.frontier.pending_count(),
            self.frontier.delay()
        );

        let results: Vec<Result<(), CrawlError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.threads)
                .map(|id| {
                    thread::Builder::new()
                        .name(format!("worker-{}", id))
                        .spawn_scoped(scope, move || self.worker_loop(id))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| match handle {
                    Ok(handle) => match handle.join() {
                        Ok(result) => result.map_err(CrawlError::from),
                        Err(_) => Err(CrawlError::WorkerPanicked(id)),
                    },
                    Err(e) => {
                        // Spawning failed; the other workers still drain the frontier
                        warn!("Failed to spawn worker: {}", e);
                        Ok(())
                    }
                })
                .collect()
        });

        self.save_analytics();

        for result in results {
            result?;
        }

        let summary = CrawlSummary {
            urls_dispatched: self.urls_dispatched.load(Ordering::Relaxed),
            urls_discovered: self.urls_discovered.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
            stats: self.stats.snapshot(),
        };
        info!(
            "Crawl finished: {} URLs fetched, {} discovered in {:.1}s",
            summary.urls_dispatched,
            summary.urls_discovered,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    fn worker_loop(&self, id: usize) -> Result<(), FrontierError> {
        let _guard = ShutdownOnPanic {
            frontier: &self.frontier,
            worker: id,
        };
        let pipeline = Pipeline {
            gate: &self.gate,
            dedup: &self.dedup,
            filter: &self.filter,
            stats: &self.stats,
        };

        while let Some(url) = self.frontier.next_url() {
            self.urls_dispatched.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.process_url(&pipeline, &url) {
                error!("Worker {} stopping on storage error at {}: {}", id, url, e);
                self.frontier.shutdown();
                return Err(e);
            }
        }

        info!("Worker {} stopping: frontier is empty", id);
        Ok(())
    }

    fn process_url(&self, pipeline: &Pipeline<'_>, url: &str) -> Result<(), FrontierError> {
        let fetched = self.fetcher.fetch(url);
        let status = fetched.as_ref().map(|r| r.status_code).ok();
        let outcome = pipeline.process(url, fetched);

        for link in outcome.accepted_links() {
            if self.frontier.add_url(link)? {
                self.urls_discovered.fetch_add(1, Ordering::Relaxed);
            }
        }

        match (&outcome, status) {
            (PageOutcome::Processed { outlinks, accepted }, Some(status)) => info!(
                "Downloaded {}, status <{}>, {} outlinks ({} accepted)",
                url,
                status,
                outlinks,
                accepted.len()
            ),
            (PageOutcome::Skipped(reason), _) => info!("Downloaded {}, skipped: {}", url, reason),
            _ => {}
        }

        self.frontier.mark_complete(url)?;

        if let Some(path) = &self.analytics_file {
            self.stats.maybe_save(path, self.analytics_save_interval);
        }
        Ok(())
    }

    fn save_analytics(&self) {
        if let Some(path) = &self.analytics_file {
            if let Err(e) = self.stats.save(path) {
                warn!("Failed to save analytics to {}: {:#}", path.display(), e);
            }
        }
    }
}

/// Shuts the frontier down when a worker unwinds. The URL it was
/// processing is never marked complete, so without this the other workers
/// would wait on it forever.
struct ShutdownOnPanic<'a> {
    frontier: &'a Frontier,
    worker: usize,
}

impl Drop for ShutdownOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Worker {} panicked, shutting down the crawl", self.worker);
            self.frontier.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::fetcher::{FetchError, FetchResult};
    use crate::storage::MemoryStore;
    use std::collections::HashMap;
    use std::time::Duration;

    struct CannedFetcher {
        pages: HashMap<String, String>,
    }

    impl PageFetcher for CannedFetcher {
        fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
            match self.pages.get(url) {
                Some(body) => Ok(FetchResult::new(200, url, body.as_str())),
                None => Ok(FetchResult::new(404, url, "")),
            }
        }
    }

    fn page(words: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!("<a href=\"{}\">link</a>", l))
            .collect();
        format!(
            "<html><body><p>{} {}</p>{}</body></html>",
            words,
            "filler text to pass the minimum page size for the content gate",
            anchors
        )
    }

    /// Serves an ordinary page everywhere except `/boom`, where it panics
    struct PanickingFetcher;

    impl PageFetcher for PanickingFetcher {
        fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
            if url.ends_with("/boom") {
                panic!("fetch blew up on {}", url);
            }
            Ok(FetchResult::new(200, url, page("ordinary page", &[])))
        }
    }

    fn crawler(pages: HashMap<String, String>, seeds: &[&str], threads: usize) -> Crawler {
        crawler_with(Arc::new(CannedFetcher { pages }), seeds, threads)
    }

    fn crawler_with(fetcher: Arc<dyn PageFetcher>, seeds: &[&str], threads: usize) -> Crawler {
        let mut config = Config::default();
        config.crawler.threads = threads;

        let filter = Arc::new(UrlFilter::new(&config.filter).unwrap());
        let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
        let frontier = Frontier::new(
            &seeds,
            Duration::from_millis(5),
            Box::new(MemoryStore::new()),
            false,
            &filter,
        )
        .unwrap()
        .with_idle_poll(Duration::from_millis(20));

        Crawler::new(&config, Arc::new(frontier), filter, fetcher)
    }

    #[test]
    fn test_crawl_follows_links_until_done() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://www.ics.uci.edu".to_string(),
            page(
                "alpha department home",
                &["/a", "https://www.stat.uci.edu/b", "https://example.com/c"],
            ),
        );
        pages.insert(
            "https://www.ics.uci.edu/a".to_string(),
            page("bravo research groups and labs", &["/"]),
        );
        pages.insert(
            "https://www.stat.uci.edu/b".to_string(),
            page("charlie statistics seminar schedule", &["/missing"]),
        );

        let crawler = crawler(pages, &["https://www.ics.uci.edu/"], 3);
        let summary = crawler.run().unwrap();

        assert_eq!(summary.urls_dispatched, 4);
        assert_eq!(summary.urls_discovered, 3);
        assert_eq!(summary.stats.unique_urls.len(), 3);
        assert_eq!(summary.stats.skipped_not_200, 1);
        assert_eq!(summary.stats.skipped_url_filter, 1);
        assert!(crawler.frontier().is_finished());
        assert_eq!(crawler.frontier().active_workers(), 0);
    }

    #[test]
    fn test_empty_frontier_returns_immediately() {
        let crawler = crawler(HashMap::new(), &[], 2);
        let summary = crawler.run().unwrap();
        assert_eq!(summary.urls_dispatched, 0);
    }

    #[test]
    fn test_worker_panic_ends_run() {
        // Whichever worker draws the panicking URL, the others must not hang
        for _ in 0..5 {
            let crawler = crawler_with(
                Arc::new(PanickingFetcher),
                &["http://a.ics.uci.edu/ok", "http://b.ics.uci.edu/boom"],
                4,
            );
            let frontier = Arc::clone(crawler.frontier());

            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(crawler.run());
            });

            let result = rx
                .recv_timeout(Duration::from_secs(10))
                .expect("crawl did not return after a worker panic");
            assert!(matches!(result, Err(CrawlError::WorkerPanicked(_))));
            assert_eq!(frontier.next_url(), None);
        }
    }
}
