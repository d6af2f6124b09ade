//! Sitemap-Ripple: a round-based sitemap crawler
//!
//! This crate discovers the reachable pages of a single website by following
//! links from a seed URL, then serializes the result as a sitemap XML document.
//! Crawls advance in bounded rounds and persist their state after every round,
//! so a crawl survives restarts of the process driving it.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sitemap-Ripple operations
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Crawl not found: {0}")]
    CrawlNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Batch worker failed: {0}")]
    Worker(String),

    #[error("Sitemap generation failed: {0}")]
    Sitemap(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Sitemap-Ripple operations
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BatchWorker, Coordinator, HttpBatchWorker, RoundOutcome};
pub use output::{generate_sitemap, SitemapOptions};
pub use service::SitemapService;
pub use state::{ChangeFrequency, CrawlOptions, CrawlState, FrontierEntry, PageRecord};
pub use storage::{MemoryStateStore, SqliteStateStore, StateStore};
pub use url::{normalize_url, InclusionPolicy};
