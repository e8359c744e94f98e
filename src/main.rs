use chrono::Utc;
use serde_json::Value;
use stayscout::analyzer::ResultAggregator;
use stayscout::config::load_config;
use stayscout::report::render_report;
use stayscout::scraper::{CandidateSource, JsonFileSource, PageFetcher, PriceEnricher};
use stayscout::service::SearchService;
use stayscout::storage::{ResultCache, SqliteCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // stayscout [CONFIG_PATH] REFERENCE_PATH
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, reference_path) = match args.as_slice() {
        [reference] => (DEFAULT_CONFIG, reference.as_str()),
        [config, reference] => (config.as_str(), reference.as_str()),
        _ => {
            eprintln!("usage: stayscout [CONFIG_PATH] REFERENCE_PATH");
            std::process::exit(2);
        }
    };

    let config = match load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let reference: Value = match tokio::fs::read_to_string(reference_path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                error!("Reference listing is not valid JSON: {}", e);
                return;
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}", reference_path, e);
            return;
        }
    };

    let Some(ttl) = config.cache_ttl() else {
        error!("Config error: cache_ttl_hours out of range ({})", config.cache_ttl_hours);
        return;
    };
    let cache = match SqliteCache::new(&config.database_path, ttl) {
        Ok(c) => Arc::new(Mutex::new(c)),
        Err(e) => {
            error!("Failed to initialize cache: {:?}", e);
            return;
        }
    };
    match cache.lock().await.purge_expired() {
        Ok(0) => {}
        Ok(n) => info!("Purged {} expired cache entries", n),
        Err(e) => warn!("Cache purge failed: {:?}", e),
    }

    let sources: Vec<Box<dyn CandidateSource>> = config
        .sources
        .iter()
        .map(|s| Box::new(JsonFileSource::new(&s.name, &s.path)) as Box<dyn CandidateSource>)
        .collect();
    info!("Configured sources: {}", sources.len());

    let mut service = SearchService::new(
        sources,
        cache,
        ResultAggregator::new(config.thresholds.clone()),
    );
    if config.enrich_prices {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        match PageFetcher::new(&config.user_agent, timeout) {
            Ok(fetcher) => service = service.with_enricher(PriceEnricher::new(Box::new(fetcher))),
            Err(e) => warn!("Price lookups disabled: {}", e),
        }
    }

    let response = match service.search(&reference, Utc::now().date_naive()).await {
        Ok(r) => r,
        Err(e) => {
            error!("Search failed: {}", e);
            return;
        }
    };
    if response.from_cache {
        info!("Served from cache");
    }

    println!("{}", render_report(&response.result, config.report_similar_limit));

    match serde_json::to_string_pretty(&response.result) {
        Ok(json) => match tokio::fs::write(&config.output_path, json).await {
            Ok(()) => info!("Results written to {}", config.output_path),
            Err(e) => warn!("Failed to write {}: {}", config.output_path, e),
        },
        Err(e) => warn!("Failed to serialize results: {}", e),
    }
}
