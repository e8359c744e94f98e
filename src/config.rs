use crate::model::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;

/// Score boundaries used by the categorizer and the deduplicator.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub exact_match: f64,
    pub same_complex: f64,
    pub nearby: f64,
    /// Anything below this is noise and never shown.
    pub city_wide: f64,
    /// Pairwise similarity above which two candidates are the same listing.
    pub duplicate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            exact_match: 90.0,
            same_complex: 80.0,
            nearby: 70.0,
            city_wide: 50.0,
            duplicate: 95.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub cache_ttl_hours: i64,
    pub enrich_prices: bool,
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    pub output_path: String,
    pub report_similar_limit: usize,
    pub thresholds: Thresholds,
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "stayscout.db".to_string(),
            cache_ttl_hours: 24,
            enrich_prices: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) StayScoutBot/0.1".to_string(),
            request_timeout_seconds: 15,
            output_path: "results.json".to_string(),
            report_similar_limit: 5,
            thresholds: Thresholds::default(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Cache time-to-live. `None` when `cache_ttl_hours` is negative or too large.
    pub fn cache_ttl(&self) -> Option<TimeDelta> {
        if self.cache_ttl_hours < 0 {
            return None;
        }
        TimeDelta::try_hours(self.cache_ttl_hours)
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    Ok(config)
}
