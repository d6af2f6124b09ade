//! Storage module for persisting crawl state
//!
//! Crawl state is stored as one JSON snapshot per crawl id. Two backends are
//! provided:
//! - `MemoryStateStore`: a process-local registry with a time-to-live
//! - `SqliteStateStore`: a SQLite database that survives restarts

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use std::sync::Arc;

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn load(&self, id: &str) -> StorageResult<Option<crate::state::CrawlState>> {
        (**self).load(id)
    }

    fn save(&self, id: &str, state: &crate::state::CrawlState) -> StorageResult<()> {
        (**self).save(id, state)
    }

    fn clear(&self, id: &str) -> StorageResult<()> {
        (**self).clear(id)
    }

    fn sweep(&self) -> StorageResult<usize> {
        (**self).sweep()
    }
}
