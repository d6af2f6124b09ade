//! Progress and result views over a crawl state

use crate::state::{CrawlState, PageRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of a running crawl's progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub urls_scanned: usize,
    pub total_urls: usize,
    pub time_elapsed: String,
    pub estimated_time_remaining: String,
    pub current_url: String,
    pub percent_complete: u8,
}

/// Final result of a crawl
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub urls: Vec<PageRecord>,
    pub start_url: String,
    /// Crawl duration in seconds (at least one)
    pub crawl_time: u64,
}

impl CrawlProgress {
    /// Derives progress from a state as of `now`
    pub fn from_state(state: &CrawlState, now: DateTime<Utc>) -> Self {
        let elapsed_ms = (now - state.started_at).num_milliseconds().max(0) as u64;
        let processed = state.urls_count.processed;
        let pending = state.urls_count.pending;

        let estimated_time_remaining = if processed > 0 && pending > 0 {
            let ms_per_url = elapsed_ms / processed as u64;
            format_duration(ms_per_url * pending as u64 / 1000)
        } else {
            "Calculating...".to_string()
        };

        let percent_complete = if state.urls_count.total > 0 {
            ((processed * 100) / state.urls_count.total).min(100) as u8
        } else {
            0
        };

        Self {
            urls_scanned: processed,
            total_urls: state.urls_count.total,
            time_elapsed: format_duration(elapsed_ms / 1000),
            estimated_time_remaining,
            current_url: state
                .current_batch_urls
                .first()
                .map(|entry| entry.url.clone())
                .unwrap_or_default(),
            percent_complete,
        }
    }
}

impl CrawlResult {
    /// Builds the result of a crawl as of `now`
    pub fn from_state(state: &CrawlState, now: DateTime<Utc>) -> Self {
        let elapsed = (now - state.started_at).num_seconds().max(0) as u64;
        Self {
            urls: state.results(),
            start_url: state.root_url.clone(),
            crawl_time: elapsed.max(1),
        }
    }
}

/// Formats a number of seconds as HH:MM:SS
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
