use anyhow::{Context, Result};
use campuscrawl::{
    config::Config,
    scraping::{
        analytics::{CrawlStats, StatsSnapshot},
        fetcher::FetchConfig,
        Crawler, Frontier, HttpFetcher, UrlFilter,
    },
    storage::{RecordStore, SledStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line settings layered over the config file
#[derive(Debug, Default)]
pub struct CrawlOverrides {
    pub restart: bool,
    pub threads: Option<usize>,
    pub delay_ms: Option<u64>,
    pub save_file: Option<PathBuf>,
    pub seeds: Vec<String>,
}

impl CrawlOverrides {
    fn apply(self, config: &mut Config) -> bool {
        if let Some(threads) = self.threads {
            config.crawler.threads = threads;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.crawler.politeness_delay_ms = delay_ms;
        }
        if let Some(save_file) = self.save_file {
            config.crawler.save_file = save_file;
        }
        if !self.seeds.is_empty() {
            config.crawler.seed_urls = self.seeds;
        }
        self.restart
    }
}

pub fn run_crawl(mut config: Config, overrides: CrawlOverrides) -> Result<()> {
    let restart = overrides.apply(&mut config);
    config.validate()?;

    let crawler_config = &config.crawler;
    let filter = Arc::new(UrlFilter::new(&config.filter)?);

    let store = SledStore::open(&crawler_config.save_file).with_context(|| {
        format!(
            "Failed to open frontier database {}",
            crawler_config.save_file.display()
        )
    })?;
    let resuming = !restart && !store.is_empty();

    let stats = if resuming {
        match StatsSnapshot::load(&crawler_config.analytics_file) {
            Ok(Some(snapshot)) => {
                info!(
                    "Restored analytics from {} ({} pages processed)",
                    crawler_config.analytics_file.display(),
                    snapshot.pages_processed
                );
                CrawlStats::from_snapshot(snapshot)
            }
            Ok(None) => CrawlStats::new(),
            Err(e) => {
                warn!("Ignoring unreadable analytics file: {:#}", e);
                CrawlStats::new()
            }
        }
    } else {
        CrawlStats::new()
    };

    let frontier = Frontier::new(
        &crawler_config.seed_urls,
        crawler_config.politeness_delay(),
        Box::new(store),
        !restart,
        &filter,
    )?
    .with_idle_poll(crawler_config.idle_poll());

    let fetcher = HttpFetcher::new(&FetchConfig::from_config(crawler_config, &config.content))?;

    let crawler = Crawler::new(&config, Arc::new(frontier), filter, Arc::new(fetcher))
        .with_stats(Arc::new(stats))
        .with_analytics_file(&crawler_config.analytics_file);

    let summary = crawler.run()?;

    println!("\nCrawl Complete");
    println!("==============");
    println!("URLs fetched this run: {}", summary.urls_dispatched);
    println!("URLs discovered this run: {}", summary.urls_discovered);
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!("Unique pages (all runs): {}", summary.stats.unique_urls.len());
    println!("Skipped pages (all runs): {}", summary.stats.total_page_skips());
    println!(
        "Analytics saved to {}",
        crawler_config.analytics_file.display()
    );

    Ok(())
}
