use crate::model::{RawRecord, ReferenceProperty};
use crate::normalizer::normalize_candidate;
use crate::parser::{Parser, PriceParser};
use crate::scraper::fetcher::build_url;
use crate::scraper::traits::Scraper;
use futures::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Looks up nightly prices for raw records that have a URL but no price.
pub struct PriceEnricher {
    scraper: Box<dyn Scraper>,
    parser: PriceParser,
}

impl PriceEnricher {
    pub fn new(scraper: Box<dyn Scraper>) -> Self {
        Self {
            scraper,
            parser: PriceParser::new(),
        }
    }

    /// Fills `nightly_price` in place. Each distinct URL is fetched once, all
    /// fetches run concurrently. Returns how many records received a price.
    pub async fn enrich(&self, reference: &ReferenceProperty, batches: &mut [Vec<RawRecord>]) -> usize {
        let mut targets: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
        for (b, batch) in batches.iter().enumerate() {
            for (r, record) in batch.iter().enumerate() {
                if let Some(url) = missing_price_url(record) {
                    targets.entry(url).or_default().push((b, r));
                }
            }
        }
        if targets.is_empty() {
            return 0;
        }

        info!("Looking up prices for {} listings", targets.len());
        let lookups = targets.keys().map(|url| self.lookup(url, reference));
        let prices = join_all(lookups).await;

        let mut filled = 0;
        for (positions, price) in targets.values().zip(prices) {
            let Some(price) = price else { continue };
            for &(b, r) in positions {
                if let Some(obj) = batches[b][r].as_object_mut() {
                    obj.insert("nightly_price".to_string(), json!(price));
                    filled += 1;
                }
            }
        }
        info!("Filled {} missing prices", filled);
        filled
    }

    async fn lookup(&self, url: &str, reference: &ReferenceProperty) -> Option<f64> {
        let target = match build_url(url, reference) {
            Ok(target) => target,
            Err(e) => {
                warn!("Skipping price lookup: {}", e);
                return None;
            }
        };
        let html = match self.scraper.fetch(&target).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Price page fetch failed for {}: {}", url, e);
                return None;
            }
        };
        match self.parser.parse(&html) {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("No price found on {}: {}", url, e);
                None
            }
        }
    }
}

fn missing_price_url(record: &RawRecord) -> Option<String> {
    let candidate = normalize_candidate(record).ok()?;
    if candidate.nightly_price.is_some() {
        return None;
    }
    candidate.url
}
