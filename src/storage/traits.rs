//! Storage traits and error types
//!
//! This module defines the trait interface for crawl state stores and
//! associated error types.

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot for {id} is {size} bytes, store limit is {limit}")]
    CapacityExceeded { id: String, size: usize, limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl state stores
///
/// A store keeps one JSON snapshot per crawl id. Implementations must be
/// safe to share between tasks; the store is the single source of truth for
/// a crawl between rounds.
pub trait StateStore: Send + Sync {
    /// Loads the snapshot for `id`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - The stored state
    /// * `Ok(None)` - No crawl with this id (or it expired)
    fn load(&self, id: &str) -> StorageResult<Option<CrawlState>>;

    /// Replaces the snapshot for `id`
    ///
    /// Fails with `StorageError::CapacityExceeded` when the serialized state
    /// is larger than the store accepts.
    fn save(&self, id: &str, state: &CrawlState) -> StorageResult<()>;

    /// Removes the snapshot for `id`; removing an unknown id is not an error
    fn clear(&self, id: &str) -> StorageResult<()>;

    /// Evicts expired snapshots and returns how many were removed
    fn sweep(&self) -> StorageResult<usize>;
}

/// Serializes a state, enforcing an optional size limit
pub(crate) fn encode_snapshot(
    id: &str,
    state: &CrawlState,
    limit: Option<usize>,
) -> StorageResult<String> {
    let snapshot = serde_json::to_string(state)?;

    if let Some(limit) = limit {
        if snapshot.len() > limit {
            return Err(StorageError::CapacityExceeded {
                id: id.to_string(),
                size: snapshot.len(),
                limit,
            });
        }
    }

    Ok(snapshot)
}
