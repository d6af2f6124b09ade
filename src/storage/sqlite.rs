//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{encode_snapshot, StateStore, StorageResult};
use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite state store
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
    ttl: Option<Duration>,
    max_snapshot_bytes: Option<usize>,
}

impl SqliteStateStore {
    /// Opens or creates a state database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStateStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            ttl: None,
            max_snapshot_bytes: None,
        }
    }

    /// Makes `sweep` delete crawls untouched for longer than `ttl`
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Limits the size of a single serialized snapshot
    pub fn with_max_snapshot_bytes(mut self, limit: usize) -> Self {
        self.max_snapshot_bytes = Some(limit);
        self
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl StateStore for SqliteStateStore {
    fn load(&self, id: &str) -> StorageResult<Option<CrawlState>> {
        let snapshot: Option<String> = self
            .conn()
            .query_row(
                "SELECT snapshot FROM crawl_states WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match snapshot {
            Some(snapshot) => Ok(Some(serde_json::from_str(&snapshot)?)),
            None => Ok(None),
        }
    }

    fn save(&self, id: &str, state: &CrawlState) -> StorageResult<()> {
        let snapshot = encode_snapshot(id, state, self.max_snapshot_bytes)?;
        self.conn().execute(
            "INSERT INTO crawl_states (id, snapshot, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET snapshot = excluded.snapshot, updated_at = excluded.updated_at",
            params![id, snapshot, timestamp(Utc::now())],
        )?;
        Ok(())
    }

    fn clear(&self, id: &str) -> StorageResult<()> {
        self.conn()
            .execute("DELETE FROM crawl_states WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn sweep(&self) -> StorageResult<usize> {
        let Some(ttl) = self.ttl else {
            return Ok(0);
        };

        let cutoff = timestamp(Utc::now() - ttl);
        let removed = self.conn().execute(
            "DELETE FROM crawl_states WHERE updated_at < ?1",
            params![cutoff],
        )?;

        if removed > 0 {
            tracing::info!("Swept {} expired crawls", removed);
        }
        Ok(removed)
    }
}
