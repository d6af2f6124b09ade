use crate::state::{ChangeFrequency, CrawlOptions};
use serde::Deserialize;

/// Main configuration structure for Sitemap-Ripple
///
/// Every section and key is optional; missing values take the defaults
/// shown in `config.example.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration, the defaults for every new crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from the seed URL
    pub max_depth: u32,

    /// Maximum number of pages processed per crawl
    pub max_pages: usize,

    pub include_images: bool,
    pub exclude_noindex: bool,
    pub respect_robots_txt: bool,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,

    /// Per-request timeout (milliseconds)
    pub request_timeout: u64,

    /// Delay between rounds (milliseconds)
    pub crawl_rate: u64,

    pub retry_count: u32,

    /// Initial retry backoff (milliseconds)
    pub retry_backoff: u64,

    /// URLs per batch
    pub batch_size: usize,

    /// Batches per round
    pub concurrent_batches: usize,

    pub max_requeues: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlOptions::default().into()
    }
}

impl From<CrawlOptions> for CrawlerConfig {
    fn from(options: CrawlOptions) -> Self {
        Self {
            max_depth: options.max_depth,
            max_pages: options.max_pages,
            include_images: options.include_images,
            exclude_noindex: options.exclude_noindex,
            respect_robots_txt: options.respect_robots_txt,
            change_frequency: options.change_frequency,
            priority: options.priority,
            request_timeout: options.request_timeout,
            crawl_rate: options.crawl_rate,
            retry_count: options.retry_count,
            retry_backoff: options.retry_backoff,
            batch_size: options.batch_size,
            concurrent_batches: options.concurrent_batches,
            max_requeues: options.max_requeues,
        }
    }
}

impl From<&CrawlerConfig> for CrawlOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            include_images: config.include_images,
            exclude_noindex: config.exclude_noindex,
            respect_robots_txt: config.respect_robots_txt,
            change_frequency: config.change_frequency,
            priority: config.priority,
            request_timeout: config.request_timeout,
            crawl_rate: config.crawl_rate,
            retry_count: config.retry_count,
            retry_backoff: config.retry_backoff,
            batch_size: config.batch_size,
            concurrent_batches: config.concurrent_batches,
            max_requeues: config.max_requeues,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    pub crawler_name: String,

    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SitemapGenerator".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// The User-Agent header value, e.g. `SitemapGenerator/1.0 (+https://example.com/bot)`
    pub fn user_agent(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Crawl state persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// Path to the SQLite state database
    pub database_path: String,

    /// Seconds an untouched crawl survives before `sweep` removes it
    pub ttl: u64,

    /// Largest snapshot the store accepts, unlimited when absent
    pub max_snapshot_bytes: Option<usize>,

    /// Processed pages kept when a snapshot has to be shrunk
    pub retain_on_overflow: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./sitemap-ripple.db".to_string(),
            ttl: 3600,
            max_snapshot_bytes: None,
            retain_on_overflow: crate::crawler::DEFAULT_RETAIN_ON_OVERFLOW,
        }
    }
}

impl StorageConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl.min(i32::MAX as u64) as i64)
    }
}

/// Sitemap output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Where the sitemap is written
    pub sitemap_path: String,

    /// Indent the document
    pub pretty: bool,

    /// Base for relative URLs; defaults to the crawl root
    pub hostname: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sitemap_path: "./sitemap.xml".to_string(),
            pretty: true,
            hostname: None,
        }
    }
}
