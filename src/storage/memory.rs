//! In-memory state store
//!
//! A process-local registry of crawl snapshots with a time-to-live. Expired
//! crawls are invisible to `load` and removed by `sweep`.

use crate::state::CrawlState;
use crate::storage::traits::{encode_snapshot, StateStore, StorageResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Default lifetime of an untouched crawl
pub const DEFAULT_TTL_SECS: i64 = 3600;

struct Entry {
    snapshot: String,
    updated_at: DateTime<Utc>,
}

/// In-memory registry of crawl snapshots
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    max_snapshot_bytes: Option<usize>,
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStateStore {
    /// Creates a store with the default one hour TTL and no size limit
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            max_snapshot_bytes: None,
        }
    }

    /// Sets how long an untouched crawl survives
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Limits the size of a single serialized snapshot
    pub fn with_max_snapshot_bytes(mut self, limit: usize) -> Self {
        self.max_snapshot_bytes = Some(limit);
        self
    }

    /// Number of crawls currently held, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now - entry.updated_at > self.ttl
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, id: &str) -> StorageResult<Option<CrawlState>> {
        let entries = self.entries();
        match entries.get(id) {
            Some(entry) if !self.is_expired(entry, Utc::now()) => {
                Ok(Some(serde_json::from_str(&entry.snapshot)?))
            }
            _ => Ok(None),
        }
    }

    fn save(&self, id: &str, state: &CrawlState) -> StorageResult<()> {
        let snapshot = encode_snapshot(id, state, self.max_snapshot_bytes)?;
        self.entries().insert(
            id.to_string(),
            Entry {
                snapshot,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn clear(&self, id: &str) -> StorageResult<()> {
        self.entries().remove(id);
        Ok(())
    }

    fn sweep(&self) -> StorageResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.updated_at <= self.ttl);
        let removed = before - entries.len();

        if removed > 0 {
            tracing::info!("Swept {} expired crawls", removed);
        }
        Ok(removed)
    }
}
