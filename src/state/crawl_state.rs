//! Crawl state - the aggregate root persisted between rounds
//!
//! A `CrawlState` holds everything needed to resume a crawl: the frontier,
//! the set of discovered URLs, the processed page records and the counters
//! derived from them. It is mutated only by the coordinator's merge step.
//!
//! Invariants maintained by the methods on this type:
//! - `discovered` contains every processed, pending and in-flight URL
//! - a URL enters `discovered` once and never leaves it
//! - `urls_count` mirrors the sizes of `discovered`, `processed_urls` and `pending_urls`

use crate::state::{CrawlOptions, PageRecord};
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// A URL waiting in the frontier together with its discovery depth
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "FrontierEntryRepr")]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Wire form accepting either a bare URL string or a `{url, depth}` object
#[derive(Deserialize)]
#[serde(untagged)]
enum FrontierEntryRepr {
    Url(String),
    Entry {
        url: String,
        #[serde(default)]
        depth: u32,
    },
}

impl From<FrontierEntryRepr> for FrontierEntry {
    fn from(repr: FrontierEntryRepr) -> Self {
        match repr {
            FrontierEntryRepr::Url(url) => Self::new(url, 0),
            FrontierEntryRepr::Entry { url, depth } => Self::new(url, depth),
        }
    }
}

/// URL counters kept alongside the state for progress reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCounters {
    pub total: usize,
    pub processed: usize,
    pub pending: usize,
}

/// Persistent state of one crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlState {
    /// Normalized seed URL; its host bounds the crawl
    pub root_url: String,

    /// Options fixed at crawl start
    pub options: CrawlOptions,

    /// Fingerprint of `options` at crawl start
    pub options_fingerprint: String,

    /// Every discovered URL in discovery order
    pub all_urls: Vec<String>,

    /// Processed pages keyed by normalized URL
    pub processed_urls: HashMap<String, PageRecord>,

    /// Frontier queue
    pub pending_urls: VecDeque<FrontierEntry>,

    /// Every URL ever discovered
    pub discovered: HashSet<String>,

    /// Depth of the shallowest URL in the most recent round
    pub current_depth: u32,

    /// When the crawl started
    pub started_at: DateTime<Utc>,

    pub urls_count: UrlCounters,

    pub is_cancelled: bool,

    pub is_complete: bool,

    /// URLs dispatched in the round currently in flight
    pub current_batch_urls: Vec<FrontierEntry>,

    /// How often each URL went back to the frontier after a failed batch
    #[serde(default)]
    pub requeue_counts: HashMap<String, u32>,

    /// Pages processed over the whole crawl; unlike `processed_urls` this
    /// never shrinks
    #[serde(default)]
    pub pages_processed: usize,
}

impl CrawlState {
    /// Creates the initial state for a crawl rooted at `root_url`
    ///
    /// The normalized root is the only discovered URL and the sole pending
    /// entry, at depth 0.
    pub fn new(root_url: &str, options: CrawlOptions) -> Self {
        let root = normalize_url(root_url);
        let options_fingerprint = options.fingerprint();

        let mut discovered = HashSet::new();
        discovered.insert(root.clone());

        let mut pending_urls = VecDeque::new();
        pending_urls.push_back(FrontierEntry::new(root.clone(), 0));

        Self {
            root_url: root.clone(),
            options,
            options_fingerprint,
            all_urls: vec![root],
            processed_urls: HashMap::new(),
            pending_urls,
            discovered,
            current_depth: 0,
            started_at: Utc::now(),
            urls_count: UrlCounters {
                total: 1,
                processed: 0,
                pending: 1,
            },
            is_cancelled: false,
            is_complete: false,
            current_batch_urls: Vec::new(),
            requeue_counts: HashMap::new(),
            pages_processed: 0,
        }
    }

    /// Returns true once the crawl is cancelled or complete
    pub fn is_terminal(&self) -> bool {
        self.is_cancelled || self.is_complete
    }

    /// Pages processed so far, including any dropped from a shrunk snapshot
    pub fn pages_processed(&self) -> usize {
        self.pages_processed.max(self.processed_urls.len())
    }

    /// Number of pages that may still be processed before `max_pages` is hit
    pub fn remaining_capacity(&self) -> usize {
        self.options
            .max_pages
            .saturating_sub(self.pages_processed())
    }

    /// Returns true if there is nothing left to do
    pub fn should_complete(&self) -> bool {
        self.pending_urls.is_empty() || self.remaining_capacity() == 0
    }

    /// Moves the next round's URLs from the frontier into the in-flight set
    ///
    /// At most `round_size` URLs are taken, and never more than the remaining
    /// page capacity, so a round can not push the processed count past `max_pages`.
    pub fn begin_round(&mut self) -> Vec<FrontierEntry> {
        let count = self
            .options
            .round_size()
            .min(self.remaining_capacity())
            .min(self.pending_urls.len());

        let batch: Vec<FrontierEntry> = self.pending_urls.drain(..count).collect();
        if let Some(first) = batch.first() {
            self.current_depth = first.depth;
        }
        self.current_batch_urls = batch.clone();
        self.recount();
        batch
    }

    /// Returns every in-flight URL to the front of the frontier, in order
    pub fn restore_in_flight(&mut self) {
        for entry in self.current_batch_urls.drain(..).rev() {
            self.pending_urls.push_front(entry);
        }
        self.recount();
    }

    /// Returns URLs from a failed batch to the front of the frontier
    ///
    /// A URL that has already been requeued `max_requeues` times is recorded
    /// as a minimal page instead, so a persistently failing worker can not
    /// keep a crawl alive forever. Returns the number of URLs recorded that way.
    pub fn requeue(&mut self, entries: Vec<FrontierEntry>) -> usize {
        let mut given_up = 0;

        for entry in entries.into_iter().rev() {
            let attempts = self.requeue_counts.entry(entry.url.clone()).or_insert(0);
            *attempts += 1;

            if *attempts > self.options.max_requeues {
                tracing::warn!(
                    "Giving up on {} after {} failed batches",
                    entry.url,
                    attempts
                );
                let stub = PageRecord::stub(
                    entry.url,
                    self.options.change_frequency,
                    self.options.priority,
                );
                self.record_page(stub);
                given_up += 1;
            } else {
                self.pending_urls.push_front(entry);
            }
        }

        self.recount();
        given_up
    }

    /// Stores a processed page, merging with an existing record for the same
    /// normalized URL. Returns the normalized URL.
    pub fn record_page(&mut self, mut record: PageRecord) -> String {
        let url = normalize_url(&record.url);
        record.url = url.clone();

        if self.discovered.insert(url.clone()) {
            self.all_urls.push(url.clone());
        }

        match self.processed_urls.get_mut(&url) {
            Some(existing) => existing.merge(record),
            None => {
                self.pages_processed = self.pages_processed() + 1;
                self.processed_urls.insert(url.clone(), record);
            }
        }

        self.requeue_counts.remove(&url);
        url
    }

    /// Adds a newly found URL to the frontier
    ///
    /// Returns false when the URL is empty or invalid after normalization,
    /// deeper than `max_depth`, or already discovered.
    pub fn discover(&mut self, entry: FrontierEntry) -> bool {
        if entry.url.trim().is_empty() || entry.depth > self.options.max_depth {
            return false;
        }

        let url = normalize_url(&entry.url);
        if Url::parse(&url).is_err() {
            return false;
        }

        if !self.discovered.insert(url.clone()) {
            return false;
        }

        self.all_urls.push(url.clone());
        self.pending_urls
            .push_back(FrontierEntry::new(url, entry.depth));
        true
    }

    /// Clears the in-flight set and updates counters and completion
    pub fn finish_round(&mut self) {
        self.current_batch_urls.clear();
        self.recount();
        if self.should_complete() {
            self.is_complete = true;
        }
    }

    /// Recomputes the counters from the underlying collections
    pub fn recount(&mut self) {
        self.urls_count = UrlCounters {
            total: self.discovered.len(),
            processed: self.processed_urls.len(),
            pending: self.pending_urls.len(),
        };
    }

    /// Processed pages in discovery order
    pub fn results(&self) -> Vec<PageRecord> {
        self.all_urls
            .iter()
            .filter_map(|url| self.processed_urls.get(url).cloned())
            .collect()
    }

    /// Returns a copy that keeps only the `keep` most recently discovered
    /// processed pages
    ///
    /// Used when a snapshot is too large for its store. Dropped pages stay in
    /// `discovered`, so they are never crawled again, and still count toward
    /// `max_pages`.
    pub fn shrunk(&self, keep: usize) -> CrawlState {
        let mut reduced = self.clone();
        reduced.pages_processed = self.pages_processed();

        if self.processed_urls.len() > keep {
            let recent: HashSet<&String> = self
                .all_urls
                .iter()
                .rev()
                .filter(|url| self.processed_urls.contains_key(*url))
                .take(keep)
                .collect();
            reduced
                .processed_urls
                .retain(|url, _| recent.contains(url));
            reduced.recount();
        }

        reduced
    }
}
