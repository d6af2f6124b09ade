//! Per-crawl options
//!
//! A crawl's options are fixed when it starts and travel with the persisted
//! state, so every round of the same crawl sees the same values.

use crate::state::ChangeFrequency;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Immutable configuration for a single crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlOptions {
    /// Maximum number of link hops from the seed URL
    pub max_depth: u32,

    /// Maximum number of processed pages
    pub max_pages: usize,

    /// Whether image references are collected for the sitemap
    pub include_images: bool,

    /// Whether pages carrying a noindex directive are left out of the sitemap
    pub exclude_noindex: bool,

    /// Whether robots.txt directives filter discovered URLs
    pub respect_robots_txt: bool,

    /// Default change frequency written for every page
    pub change_frequency: ChangeFrequency,

    /// Default priority for pages whose depth is unknown
    pub priority: f32,

    /// Per-request timeout (milliseconds)
    pub request_timeout: u64,

    /// Delay between rounds (milliseconds)
    pub crawl_rate: u64,

    /// Number of retries for transient fetch failures
    pub retry_count: u32,

    /// Initial backoff between retries (milliseconds), doubled per attempt
    pub retry_backoff: u64,

    /// Number of URLs handed to one batch worker call
    pub batch_size: usize,

    /// Number of batches dispatched concurrently in one round
    pub concurrent_batches: usize,

    /// How often a URL may be returned to the frontier after a failed batch
    pub max_requeues: u32,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 2000,
            include_images: true,
            exclude_noindex: true,
            respect_robots_txt: true,
            change_frequency: ChangeFrequency::Weekly,
            priority: 0.7,
            request_timeout: 10_000,
            crawl_rate: 0,
            retry_count: 1,
            retry_backoff: 500,
            batch_size: 5,
            concurrent_batches: 3,
            max_requeues: 3,
        }
    }
}

impl CrawlOptions {
    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Timeout used for the robots.txt request (never longer than five seconds)
    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout.min(5_000))
    }

    /// Delay inserted between rounds
    pub fn crawl_rate(&self) -> Duration {
        Duration::from_millis(self.crawl_rate)
    }

    /// Maximum number of URLs dispatched in one round
    pub fn round_size(&self) -> usize {
        self.batch_size.max(1) * self.concurrent_batches.max(1)
    }

    /// Computes a SHA-256 fingerprint of these options
    ///
    /// Used to detect a resumed crawl being driven with different settings
    /// than the ones it was started with.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }
}
