//! Database schema definitions
//!
//! This module contains the SQL schema for the Sitemap-Ripple state database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One JSON snapshot per crawl
CREATE TABLE IF NOT EXISTS crawl_states (
    id TEXT PRIMARY KEY,
    snapshot TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_states_updated ON crawl_states(updated_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
