//! Crawler coordinator - round-based crawl orchestration
//!
//! The coordinator owns no crawl state of its own. Each round it:
//! 1. Reloads the crawl state from the store and stops if the crawl is terminal
//! 2. Moves the next URLs into the in-flight set and persists that
//! 3. Splits them into batches and runs them concurrently on the worker
//! 4. Re-checks the cancellation flag; a cancelled round is discarded
//! 5. Merges results and newly found URLs, then persists the new state
//!
//! Because every round starts from the stored snapshot, a crawl can be driven
//! by any process that has access to the store.

use crate::crawler::batch::{BatchOutput, BatchWorker};
use crate::state::{CrawlState, FrontierEntry, PageRecord};
use crate::storage::{StateStore, StorageError};
use crate::url::normalize_url;
use crate::{Result, SitemapError};
use futures::future::join_all;
use std::collections::HashSet;
use url::Url;

/// Processed records kept when a snapshot is too large for the store
pub const DEFAULT_RETAIN_ON_OVERFLOW: usize = 100;

/// What a round achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The crawl has more work
    Continue {
        /// Pages recorded this round
        processed: usize,
        /// New URLs added to the frontier this round
        discovered: usize,
    },
    /// The frontier is empty or the page cap was reached
    Complete,
    /// The crawl was cancelled
    Cancelled,
}

impl RoundOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue { .. })
    }
}

/// Drives crawls round by round over a batch worker and a state store
pub struct Coordinator<W, S> {
    worker: W,
    store: S,
    retain_on_overflow: usize,
}

impl<W: BatchWorker, S: StateStore> Coordinator<W, S> {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `worker` - Fetches and extracts batches of URLs
    /// * `store` - Persists crawl state between rounds
    pub fn new(worker: W, store: S) -> Self {
        Self {
            worker,
            store,
            retain_on_overflow: DEFAULT_RETAIN_ON_OVERFLOW,
        }
    }

    /// Sets how many processed pages survive when a snapshot has to be shrunk
    pub fn with_retain_on_overflow(mut self, keep: usize) -> Self {
        self.retain_on_overflow = keep;
        self
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a crawl's state
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlState)` - The stored state
    /// * `Err(SitemapError::CrawlNotFound)` - No crawl with this id
    pub fn load(&self, id: &str) -> Result<CrawlState> {
        self.store
            .load(id)?
            .ok_or_else(|| SitemapError::CrawlNotFound(id.to_string()))
    }

    /// Persists a crawl's state
    ///
    /// A snapshot rejected for its size is shrunk to the most recently
    /// discovered `retain_on_overflow` pages and saved once more. If that
    /// also fails the error is logged and the crawl carries on.
    pub fn persist(&self, id: &str, state: &CrawlState) -> Result<()> {
        match self.store.save(id, state) {
            Ok(()) => Ok(()),
            Err(StorageError::CapacityExceeded { size, limit, .. }) => {
                tracing::warn!(
                    "Snapshot for crawl {} is {} bytes (limit {}), keeping the {} most recent pages",
                    id,
                    size,
                    limit,
                    self.retain_on_overflow
                );
                let reduced = state.shrunk(self.retain_on_overflow);
                if let Err(e) = self.store.save(id, &reduced) {
                    tracing::error!("Failed to persist crawl {} after shrinking: {}", id, e);
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs one round of the crawl `id`
    pub async fn run_round(&self, id: &str) -> Result<RoundOutcome> {
        let mut state = self.load(id)?;

        if state.is_cancelled {
            return Ok(RoundOutcome::Cancelled);
        }
        if state.is_complete {
            return Ok(RoundOutcome::Complete);
        }
        if !state.current_batch_urls.is_empty() {
            tracing::warn!(
                "Crawl {} has {} URLs from an interrupted round, returning them to the frontier",
                id,
                state.current_batch_urls.len()
            );
            state.restore_in_flight();
        }
        if state.should_complete() {
            state.current_batch_urls.clear();
            state.is_complete = true;
            state.recount();
            self.persist(id, &state)?;
            tracing::info!(
                "Crawl {} complete: {} pages processed",
                id,
                state.urls_count.processed
            );
            return Ok(RoundOutcome::Complete);
        }

        let base_url = Url::parse(&state.root_url)?;
        let options = state.options.clone();

        let round = state.begin_round();
        self.persist(id, &state)?;

        let batches: Vec<Vec<FrontierEntry>> = round
            .chunks(options.batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();

        tracing::debug!(
            "Crawl {}: dispatching {} URLs in {} batches (depth {})",
            id,
            round.len(),
            batches.len(),
            state.current_depth
        );

        let results = join_all(
            batches
                .iter()
                .map(|batch| self.worker.process_batch(batch.clone(), &base_url, &options)),
        )
        .await;

        if self.is_cancelled_in_store(id)? {
            state.restore_in_flight();
            state.is_cancelled = true;
            self.persist(id, &state)?;
            tracing::info!(
                "Crawl {} cancelled, {} URLs left pending",
                id,
                state.urls_count.pending
            );
            return Ok(RoundOutcome::Cancelled);
        }

        let mut processed = 0;
        let mut discovered = 0;
        let mut failed = Vec::new();

        for (batch, result) in batches.into_iter().zip(results) {
            match result {
                Ok(output) => {
                    let (recorded, added) = self.merge_batch(&mut state, &batch, output);
                    processed += recorded;
                    discovered += added;
                }
                Err(e) => {
                    tracing::warn!("Batch of {} URLs failed: {}", batch.len(), e);
                    failed.extend(batch);
                }
            }
        }

        if !failed.is_empty() {
            processed += state.requeue(failed);
        }

        state.finish_round();

        // a cancel that arrived during the merge must not be overwritten
        if self.is_cancelled_in_store(id)? {
            state.is_cancelled = true;
        }

        self.persist(id, &state)?;

        tracing::info!(
            "Crawl {}: {} processed, {} pending, {} discovered",
            id,
            state.urls_count.processed,
            state.urls_count.pending,
            state.urls_count.total
        );

        Ok(if state.is_cancelled {
            RoundOutcome::Cancelled
        } else if state.is_complete {
            RoundOutcome::Complete
        } else {
            RoundOutcome::Continue {
                processed,
                discovered,
            }
        })
    }

    /// Runs rounds until the crawl is complete or cancelled
    ///
    /// Sleeps for the crawl's `crawl_rate` between rounds.
    ///
    /// # Returns
    ///
    /// The final crawl state
    pub async fn run_to_completion(&self, id: &str) -> Result<CrawlState> {
        let delay = self.load(id)?.options.crawl_rate();

        loop {
            let outcome = self.run_round(id).await?;
            if outcome.is_terminal() {
                break;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.load(id)
    }

    /// Merges one batch's output into the state
    ///
    /// Only records for URLs dispatched in `batch` are accepted; a dispatched
    /// URL the worker did not report is recorded as a minimal page. Returns
    /// the number of pages recorded and the number of new frontier URLs.
    fn merge_batch(
        &self,
        state: &mut CrawlState,
        batch: &[FrontierEntry],
        output: BatchOutput,
    ) -> (usize, usize) {
        let dispatched: HashSet<String> = batch.iter().map(|e| normalize_url(&e.url)).collect();
        let mut reported = HashSet::new();

        for record in output.processed_urls {
            let url = normalize_url(&record.url);
            if !dispatched.contains(&url) {
                tracing::warn!("Ignoring record for {} which was not dispatched", record.url);
                continue;
            }
            state.record_page(record);
            reported.insert(url);
        }

        for entry in batch {
            let url = normalize_url(&entry.url);
            if !reported.contains(&url) {
                tracing::debug!("No record returned for {}, storing a minimal one", url);
                state.record_page(PageRecord::stub(
                    url.clone(),
                    state.options.change_frequency,
                    state.options.priority,
                ));
                reported.insert(url);
            }
        }

        let mut added = 0;
        for entry in output.new_urls {
            if state.discover(entry) {
                added += 1;
            }
        }

        (reported.len(), added)
    }

    fn is_cancelled_in_store(&self, id: &str) -> Result<bool> {
        Ok(self
            .store
            .load(id)?
            .map(|stored| stored.is_cancelled)
            .unwrap_or(false))
    }
}
