pub mod crawl;
pub mod progress;
