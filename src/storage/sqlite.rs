use crate::model::{RankedResult, StorageError};
use crate::storage::{ResultCache, SearchKey};
use crate::utils::parse_datetime;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// SQLite-backed result cache. Results are stored as JSON payloads.
pub struct SqliteCache {
    conn: Connection,
    ttl: Duration,
}

impl SqliteCache {
    /// Opens the database and creates the cache table if needed.
    pub fn new(db_path: &str, ttl: Duration) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?, ttl)
    }

    pub fn in_memory(ttl: Duration) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: Duration) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS search_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_cache_stored_at
                ON search_cache (stored_at);
            ",
        )?;
        Ok(Self { conn, ttl })
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // Fixed-width UTC timestamps compare correctly as text.
    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl ResultCache for SqliteCache {
    fn get_at(&self, key: &SearchKey, now: DateTime<Utc>) -> Result<Option<RankedResult>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, stored_at FROM search_cache WHERE key = ?1",
                params![key.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((payload, stored_at)) = row else {
            return Ok(None);
        };
        let stored_at = parse_datetime(&stored_at)
            .ok_or_else(|| StorageError::InvalidTimestamp(stored_at.clone()))?;

        if now.signed_duration_since(stored_at) > self.ttl {
            debug!("Cache entry expired: {}", key);
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn put_at(
        &mut self,
        key: &SearchKey,
        result: &RankedResult,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = serde_json::to_string(result)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO search_cache (key, payload, stored_at) VALUES (?1, ?2, ?3)",
            params![key.to_string(), payload, Self::timestamp(now)],
        )?;
        Ok(())
    }

    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = Self::timestamp(now - self.ttl);
        let removed = self
            .conn
            .execute("DELETE FROM search_cache WHERE stored_at < ?1", params![cutoff])?;
        Ok(removed)
    }
}
