//! State module for tracking crawl progress
//!
//! This module provides the data model shared by the crawler, the state stores
//! and the sitemap generator.
//!
//! # Components
//!
//! - `CrawlOptions`: Immutable per-crawl configuration with defaults resolved once
//! - `PageRecord`: The per-URL output unit consumed by the sitemap serializer
//! - `CrawlState`: The aggregate root persisted after every round
//! - `CrawlProgress`: A progress view derived from a `CrawlState`

mod crawl_state;
mod options;
mod page_record;
mod progress;

// Re-export main types
pub use crawl_state::{CrawlState, FrontierEntry, UrlCounters};
pub use options::CrawlOptions;
pub use page_record::{ChangeFrequency, PageRecord};
pub use progress::{format_duration, CrawlProgress, CrawlResult};
