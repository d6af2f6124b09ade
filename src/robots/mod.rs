//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A missing or unreachable robots.txt never stops a crawl; it simply places no restrictions.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for the origin of `url`
///
/// # Arguments
///
/// * `client` - The HTTP client (carries the crawler's user agent)
/// * `url` - Any URL on the site; only its origin is used
/// * `timeout` - Timeout for this single request
///
/// # Returns
///
/// The parsed robots.txt, or an allow-all instance when the file is absent,
/// returns a non-success status, or could not be fetched.
pub async fn fetch_robots(client: &Client, url: &Url, timeout: Duration) -> ParsedRobots {
    let robots_url = match url.join("/robots.txt") {
        Ok(robots_url) => robots_url,
        Err(e) => {
            tracing::debug!("Cannot build robots.txt URL for {}: {}", url, e);
            return ParsedRobots::allow_all();
        }
    };

    let response = match client.get(robots_url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "{} returned {}, assuming no restrictions",
            robots_url,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Loaded {} ({} bytes)", robots_url, body.len());
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            tracing::debug!("Failed to read {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Returns the cache key for the origin of `url`
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}
