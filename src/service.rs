//! Sitemap service - the public entry points of a crawl
//!
//! Wraps a [`Coordinator`] with input validation, crawl id allocation,
//! progress reporting and sitemap generation. Every operation is keyed by a
//! crawl id and reads the state store, so callers may drive a crawl from
//! several processes as long as only one runs rounds at a time.

use crate::crawler::{BatchOutput, BatchWorker, Coordinator, HttpBatchWorker, RoundOutcome};
use crate::output::{generate_sitemap, SitemapOptions, NO_URLS_MESSAGE};
use crate::state::{CrawlOptions, CrawlProgress, CrawlResult, CrawlState, FrontierEntry, PageRecord};
use crate::storage::StateStore;
use crate::url::normalize_url;
use crate::{Result, SitemapError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Content type of a generated sitemap
pub const SITEMAP_CONTENT_TYPE: &str = "application/xml";

/// A request to process one batch outside of a coordinated crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub urls: Vec<FrontierEntry>,
    pub base_url: String,
    #[serde(default)]
    pub options: CrawlOptions,
}

/// A page handed to the sitemap generator directly
///
/// Either a full record or a bare URL string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PageInput {
    Url(String),
    Record(PageRecord),
}

impl PageInput {
    fn into_record(self, defaults: &CrawlOptions) -> PageRecord {
        match self {
            Self::Url(url) => PageRecord::stub(url, defaults.change_frequency, defaults.priority),
            Self::Record(record) => record,
        }
    }
}

/// Where the pages of a sitemap come from
#[derive(Debug, Clone)]
pub enum SitemapSource {
    /// Pages supplied by the caller
    Pages {
        urls: Vec<PageInput>,
        options: SitemapOptions,
    },
    /// The results of a stored crawl
    Crawl { id: String, options: SitemapOptions },
}

/// A generated sitemap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapDocument {
    pub content_type: &'static str,
    pub xml: String,
}

/// Where a crawl stands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum CrawlStatus {
    Running(CrawlProgress),
    Complete(CrawlResult),
    Cancelled(CrawlProgress),
}

/// Entry points for starting, driving and inspecting crawls
pub struct SitemapService<W, S> {
    coordinator: Coordinator<W, S>,
}

impl<S: StateStore> SitemapService<HttpBatchWorker, S> {
    /// Creates a service that fetches pages over HTTP
    pub fn with_http(user_agent: &str, timeout: Duration, store: S) -> Result<Self> {
        let worker = HttpBatchWorker::new(user_agent, timeout)?;
        Ok(Self::new(Coordinator::new(worker, store)))
    }
}

impl<W: BatchWorker, S: StateStore> SitemapService<W, S> {
    pub fn new(coordinator: Coordinator<W, S>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Coordinator<W, S> {
        &self.coordinator
    }

    /// Starts a crawl at `url`
    ///
    /// # Arguments
    ///
    /// * `url` - The seed; must be an absolute http(s) URL
    /// * `options` - Fixed for the lifetime of the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The new crawl id, `crawl-<uuid>`
    /// * `Err(SitemapError::InvalidInput)` - The seed is not a usable URL
    pub fn start_crawl(&self, url: &str, options: CrawlOptions) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SitemapError::InvalidInput("URL is required".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SitemapError::InvalidInput(format!(
                "URL must start with http:// or https://: {}",
                url
            )));
        }
        Url::parse(url)
            .map_err(|e| SitemapError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;

        let id = format!("crawl-{}", Uuid::new_v4());
        let state = CrawlState::new(url, options);
        self.coordinator.persist(&id, &state)?;

        tracing::info!("Started crawl {} at {}", id, state.root_url);
        Ok(id)
    }

    /// Compares `options` against the ones crawl `id` was started with
    ///
    /// A mismatch is logged; the crawl keeps its stored options either way.
    /// Returns true when they match.
    pub fn check_options(&self, id: &str, options: &CrawlOptions) -> Result<bool> {
        let state = self.coordinator.load(id)?;
        let matches = state.options_fingerprint == options.fingerprint();
        if !matches {
            tracing::warn!(
                "Crawl {} was started with different options; continuing with the stored ones",
                id
            );
        }
        Ok(matches)
    }

    /// Processes one batch of URLs without touching any stored crawl
    pub async fn process_batch(&self, request: BatchRequest) -> Result<BatchOutput> {
        if request.urls.is_empty() {
            return Err(SitemapError::InvalidInput("No URLs provided".to_string()));
        }
        if request.base_url.trim().is_empty() {
            return Err(SitemapError::InvalidInput("Base URL is required".to_string()));
        }

        let base_url = Url::parse(&normalize_url(&request.base_url)).map_err(|e| {
            SitemapError::InvalidInput(format!("Invalid base URL {}: {}", request.base_url, e))
        })?;

        self.coordinator
            .worker()
            .process_batch(request.urls, &base_url, &request.options)
            .await
    }

    /// Generates a sitemap from caller pages or from a stored crawl
    ///
    /// When no hostname is given it is taken from the crawl root, or from the
    /// first absolute page URL.
    pub fn generate_sitemap(&self, source: SitemapSource) -> Result<SitemapDocument> {
        let (pages, mut options) = match source {
            SitemapSource::Pages { urls, options } => {
                let defaults = CrawlOptions::default();
                let pages: Vec<PageRecord> = urls
                    .into_iter()
                    .map(|input| input.into_record(&defaults))
                    .collect();
                (pages, options)
            }
            SitemapSource::Crawl { id, mut options } => {
                let state = self.coordinator.load(&id)?;
                if options.hostname.is_none() {
                    options.hostname = origin_of(&state.root_url);
                }
                (state.results(), options)
            }
        };

        if pages.is_empty() {
            return Err(SitemapError::InvalidInput(NO_URLS_MESSAGE.to_string()));
        }

        if options.hostname.is_none() {
            options.hostname = pages.iter().find_map(|page| origin_of(&page.url));
        }
        if options.hostname.is_none() {
            return Err(SitemapError::InvalidInput(
                "Hostname is required when no page URL is absolute".to_string(),
            ));
        }

        let xml = generate_sitemap(&pages, &options)?;
        Ok(SitemapDocument {
            content_type: SITEMAP_CONTENT_TYPE,
            xml,
        })
    }

    /// Reports where crawl `id` stands
    pub fn status(&self, id: &str) -> Result<CrawlStatus> {
        let state = self.coordinator.load(id)?;
        let now = Utc::now();

        let status = if state.is_cancelled {
            CrawlStatus::Cancelled(CrawlProgress::from_state(&state, now))
        } else if state.is_complete {
            CrawlStatus::Complete(CrawlResult::from_state(&state, now))
        } else {
            CrawlStatus::Running(CrawlProgress::from_state(&state, now))
        };
        Ok(status)
    }

    /// Cancels crawl `id`
    ///
    /// URLs left in flight by an interrupted round go back to the frontier.
    pub fn cancel(&self, id: &str) -> Result<()> {
        let mut state = self.coordinator.load(id)?;
        if state.is_cancelled {
            return Ok(());
        }

        state.is_cancelled = true;
        state.restore_in_flight();
        state.recount();
        self.coordinator.persist(id, &state)?;

        tracing::info!("Cancelled crawl {}", id);
        Ok(())
    }

    pub async fn run_round(&self, id: &str) -> Result<RoundOutcome> {
        self.coordinator.run_round(id).await
    }

    pub async fn run_to_completion(&self, id: &str) -> Result<CrawlState> {
        self.coordinator.run_to_completion(id).await
    }

    /// Page records of crawl `id` in discovery order
    pub fn results(&self, id: &str) -> Result<Vec<PageRecord>> {
        Ok(self.coordinator.load(id)?.results())
    }

    /// Removes crawl `id` from the store
    pub fn delete(&self, id: &str) -> Result<()> {
        self.coordinator.load(id)?;
        self.coordinator.store().clear(id)?;
        tracing::info!("Deleted crawl {}", id);
        Ok(())
    }

    /// Evicts expired crawls, returning how many were removed
    pub fn sweep(&self) -> Result<usize> {
        Ok(self.coordinator.store().sweep()?)
    }
}

/// `scheme://host[:port]` of an absolute http(s) URL
fn origin_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    url.host_str()?;
    Some(url.origin().ascii_serialization())
}
