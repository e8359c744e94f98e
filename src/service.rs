use crate::analyzer::ResultAggregator;
use crate::model::{AggregateError, RankedResult, RawRecord, ReferenceProperty};
use crate::normalizer::normalize_reference;
use crate::scraper::{CandidateSource, PriceEnricher};
use crate::storage::{ResultCache, SearchKey};
use chrono::NaiveDate;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub result: RankedResult,
    pub from_cache: bool,
}

/// Runs one comparison end to end: cache lookup, concurrent source gathering,
/// price enrichment, aggregation, cache store.
pub struct SearchService<C: ResultCache> {
    sources: Vec<Box<dyn CandidateSource>>,
    cache: Arc<Mutex<C>>,
    aggregator: ResultAggregator,
    enricher: Option<PriceEnricher>,
}

impl<C: ResultCache> SearchService<C> {
    pub fn new(
        sources: Vec<Box<dyn CandidateSource>>,
        cache: Arc<Mutex<C>>,
        aggregator: ResultAggregator,
    ) -> Self {
        Self {
            sources,
            cache,
            aggregator,
            enricher: None,
        }
    }

    pub fn with_enricher(mut self, enricher: PriceEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// `today` is the search date used when the reference has no check-in date.
    pub async fn search(
        &self,
        reference: &RawRecord,
        today: NaiveDate,
    ) -> Result<SearchResponse, AggregateError> {
        let reference = normalize_reference(reference)?;
        let key = SearchKey::new(&reference, today);

        match self.cache.lock().await.get(&key) {
            Ok(Some(result)) => {
                info!("Cache hit for {}", key);
                return Ok(SearchResponse {
                    result,
                    from_cache: true,
                });
            }
            Ok(None) => info!("Cache miss for {}", key),
            Err(e) => warn!("Cache read failed for {}: {:?}", key, e),
        }

        let mut batches = self.gather(&reference).await;
        if let Some(enricher) = &self.enricher {
            enricher.enrich(&reference, &mut batches).await;
        }

        let result = self.aggregator.aggregate(&reference, &batches);

        if let Err(e) = self.cache.lock().await.put(&key, &result) {
            warn!("Cache write failed for {}: {:?}", key, e);
        }

        Ok(SearchResponse {
            result,
            from_cache: false,
        })
    }

    /// Queries every source concurrently. A failing source contributes an
    /// empty batch so one bad collaborator never aborts the search.
    async fn gather(&self, reference: &ReferenceProperty) -> Vec<Vec<RawRecord>> {
        let searches = self.sources.iter().map(|source| async move {
            match source.search(reference).await {
                Ok(batch) => {
                    info!("{} returned {} records", source.name(), batch.len());
                    batch
                }
                Err(e) => {
                    warn!("{} failed: {}", source.name(), e);
                    Vec::new()
                }
            }
        });
        join_all(searches).await
    }
}
