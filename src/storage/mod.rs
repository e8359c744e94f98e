// Result cache: keyed by reference listing identity and search date.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::model::{RankedResult, ReferenceProperty, StorageError};
use crate::utils::{normalize_text, normalize_url};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// Identifies one search: which listing, for which date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub identity: String,
    pub date: NaiveDate,
}

impl SearchKey {
    /// Uses the reference check-in date when known, otherwise `today`.
    pub fn new(reference: &ReferenceProperty, today: NaiveDate) -> Self {
        let identity = match &reference.url {
            // Query strings carry dates and tracking noise, not identity.
            Some(url) => normalize_url(url.split('?').next().unwrap_or(url)).to_lowercase(),
            None => format!(
                "{}|{}",
                reference.title.as_deref().map(normalize_text).unwrap_or_default(),
                reference.location.as_deref().map(normalize_text).unwrap_or_default()
            ),
        };
        Self {
            identity,
            date: reference.check_in.unwrap_or(today),
        }
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.date)
    }
}

/// Store for finished aggregation results. Entries older than the store's
/// time-to-live are treated as absent.
pub trait ResultCache: Send {
    fn get_at(&self, key: &SearchKey, now: DateTime<Utc>) -> Result<Option<RankedResult>, StorageError>;

    fn put_at(
        &mut self,
        key: &SearchKey,
        result: &RankedResult,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Removes expired entries and returns how many were dropped.
    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> Result<usize, StorageError>;

    fn get(&self, key: &SearchKey) -> Result<Option<RankedResult>, StorageError> {
        self.get_at(key, Utc::now())
    }

    fn put(&mut self, key: &SearchKey, result: &RankedResult) -> Result<(), StorageError> {
        self.put_at(key, result, Utc::now())
    }

    fn purge_expired(&mut self) -> Result<usize, StorageError> {
        self.purge_expired_at(Utc::now())
    }
}
