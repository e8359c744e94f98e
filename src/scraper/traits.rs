use crate::model::{FetchError, RawRecord, ReferenceProperty, SourceError};

/// Anything that can fetch a listing page.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// One collaborator that finds candidate listings for a reference: an owner
/// site finder, a platform searcher, a similar-property finder.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, reference: &ReferenceProperty) -> Result<Vec<RawRecord>, SourceError>;
}
