use anyhow::{Context, Result};
use campuscrawl::{config::Config, scraping::analytics::StatsSnapshot, storage::SledStore};

/// Number of words listed in the report
const TOP_WORDS: usize = 50;

/// Only subdomains under this suffix are listed
const SUBDOMAIN_SUFFIX: &str = "uci.edu";

pub fn show_progress(config: &Config) -> Result<()> {
    let save_file = &config.crawler.save_file;
    if !save_file.exists() {
        println!("No saved crawl found at {}", save_file.display());
        println!("\nStart one with:");
        println!("  campuscrawl crawl");
        return Ok(());
    }

    let store = SledStore::open(save_file)
        .with_context(|| format!("Failed to open frontier database {}", save_file.display()))?;
    let progress = store.progress()?;

    println!("\nCrawl Progress:");
    println!("===============");
    println!("Frontier database: {}", save_file.display());
    println!("Total URLs discovered: {}", progress.total);
    println!("Completed: {}", progress.completed);
    println!("Pending: {}", progress.pending());
    println!("Percent complete: {:.2}%", progress.percent_complete());

    let Some(stats) = StatsSnapshot::load(&config.crawler.analytics_file)? else {
        println!(
            "\nNo analytics found at {}",
            config.crawler.analytics_file.display()
        );
        return Ok(());
    };

    print_report(&stats);
    Ok(())
}

fn print_report(stats: &StatsSnapshot) {
    println!("\nAnalytics:");
    println!("==========");
    if let Some(saved_at) = stats.saved_at {
        println!("Saved at: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Pages processed: {}", stats.pages_processed);
    println!("Unique pages: {}", stats.unique_urls.len());
    match &stats.longest_page.url {
        Some(url) => println!(
            "Longest page: {} ({} words)",
            url, stats.longest_page.word_count
        ),
        None => println!("Longest page: none"),
    }

    println!("\nTop {} words:", TOP_WORDS);
    for (rank, (word, count)) in stats.top_words(TOP_WORDS).iter().enumerate() {
        println!("  {:>2}. {} ({})", rank + 1, word, count);
    }

    let subdomains = stats.subdomain_counts(SUBDOMAIN_SUFFIX);
    println!("\nSubdomains under {} ({}):", SUBDOMAIN_SUFFIX, subdomains.len());
    for (host, pages) in &subdomains {
        println!("  {}, {}", host, pages);
    }

    println!("\nSkipped:");
    println!("  Not 200: {}", stats.skipped_not_200);
    println!("  Empty or bad size: {}", stats.skipped_empty_or_size);
    println!("  Low text: {}", stats.skipped_low_text);
    println!("  Near-duplicate: {}", stats.skipped_duplicate);
    println!("  Fetch error: {}", stats.skipped_fetch_error);
    println!("  Outlinks rejected by filter: {}", stats.skipped_url_filter);
}
