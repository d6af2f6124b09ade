//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing and link extraction
//! - Batch processing of frontier entries
//! - Round-based crawl coordination

mod batch;
mod coordinator;
mod fetcher;
mod parser;

pub use batch::{priority_for_depth, BatchOutput, BatchWorker, HttpBatchWorker, DEFAULT_USER_AGENT};
pub use coordinator::{Coordinator, RoundOutcome, DEFAULT_RETAIN_ON_OVERFLOW};
pub use fetcher::{build_http_client, fetch_page, Backoff, FetchError, FetchedPage, RetryPolicy};
pub use parser::{parse_page, ParsedPage};
