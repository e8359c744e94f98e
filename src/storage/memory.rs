use crate::model::{RankedResult, StorageError};
use crate::storage::{ResultCache, SearchKey};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// In-process result cache, one per service instance.
pub struct MemoryCache {
    entries: HashMap<SearchKey, (DateTime<Utc>, RankedResult)>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultCache for MemoryCache {
    fn get_at(&self, key: &SearchKey, now: DateTime<Utc>) -> Result<Option<RankedResult>, StorageError> {
        Ok(self
            .entries
            .get(key)
            .filter(|(stored_at, _)| now.signed_duration_since(*stored_at) <= self.ttl)
            .map(|(_, result)| result.clone()))
    }

    fn put_at(
        &mut self,
        key: &SearchKey,
        result: &RankedResult,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.entries.insert(key.clone(), (now, result.clone()));
        Ok(())
    }

    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored_at, _)| now.signed_duration_since(*stored_at) <= ttl);
        Ok(before - self.entries.len())
    }
}
